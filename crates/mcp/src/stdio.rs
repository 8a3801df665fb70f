//! Stdio transport: a tool server running as a child process.

use std::collections::HashMap;

use rmcp::{
    ServiceExt,
    model::CallToolRequestParams,
    service::{RoleClient, RunningService},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    Error, Result, ServerInfo, ToolArguments, ToolCallResult, ToolDescriptor, ToolSession,
};

/// Interpreter used to launch the server script when none is configured.
pub const DEFAULT_COMMAND: &str = "python";

/// Server script passed to the interpreter when none is configured.
pub const DEFAULT_SCRIPT: &str = "server.py";

/// How to launch a tool server subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerParams {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl ServerParams {
    pub fn new(
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: HashMap::new(),
        }
    }

    fn to_command(&self) -> Command {
        Command::new(&self.command).configure(|cmd| {
            cmd.args(&self.args).envs(&self.env);
        })
    }
}

impl Default for ServerParams {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND, [DEFAULT_SCRIPT])
    }
}

impl std::fmt::Display for ServerParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

enum State {
    /// Process started, handshake not yet performed.
    Spawned(TokioChildProcess),
    Running(RunningService<RoleClient, ()>),
    Closed,
}

/// A session over a child process's stdin/stdout.
pub struct StdioSession {
    state: State,
}

impl StdioSession {
    /// Start the server process. The handshake happens in `initialize`.
    pub fn spawn(params: &ServerParams) -> Result<Self> {
        debug!(server = %params, "spawning tool server");
        let transport = TokioChildProcess::new(params.to_command())?;
        Ok(Self {
            state: State::Spawned(transport),
        })
    }

    fn service(&self) -> Result<&RunningService<RoleClient, ()>> {
        match &self.state {
            State::Running(service) => Ok(service),
            State::Spawned(_) => Err(Error::NotInitialized),
            State::Closed => Err(Error::Closed),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }
}

impl ToolSession for StdioSession {
    async fn initialize(&mut self) -> Result<ServerInfo> {
        let transport = match std::mem::replace(&mut self.state, State::Closed) {
            State::Spawned(transport) => transport,
            State::Running(service) => {
                self.state = State::Running(service);
                return Err(Error::AlreadyInitialized);
            }
            State::Closed => return Err(Error::Closed),
        };

        // A failed handshake consumes the transport, leaving the session closed.
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| Error::Handshake(e.to_string()))?;

        let info = service
            .peer_info()
            .map(|peer| ServerInfo {
                name: peer.server_info.name.clone(),
                version: peer.server_info.version.clone(),
            })
            .unwrap_or_default();
        info!(server = %info.name, version = %info.version, "session initialized");

        self.state = State::Running(service);
        Ok(info)
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let response = self.service()?.list_tools(Default::default()).await?;
        debug!(count = response.tools.len(), "listed tools");
        Ok(response.tools.into_iter().map(ToolDescriptor::from).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> Result<ToolCallResult> {
        let params = CallToolRequestParams {
            name: name.to_string().into(),
            arguments,
            meta: None,
            task: None,
        };

        debug!(tool = name, "calling tool");
        let result = self.service()?.call_tool(params).await?;
        Ok(ToolCallResult::from(result))
    }

    async fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Running(service) => {
                let reason = service
                    .cancel()
                    .await
                    .map_err(|e| Error::Service(e.to_string()))?;
                info!(?reason, "session closed");
            }
            State::Spawned(transport) => {
                // Never handshaked; dropping the transport kills the child.
                drop(transport);
                debug!("closed session before handshake");
            }
            State::Closed => {}
        }
        Ok(())
    }
}
