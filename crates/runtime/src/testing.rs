//! In-memory stand-ins for the tool server and the chat API.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use mcp::{ServerInfo, ToolArguments, ToolCallResult, ToolDescriptor, ToolSession};
use serde_json::json;

use crate::model::{
    Backend, FinishReason, Message, ModelError, ModelRequest, ModelResponse, ToolChoice, Usage,
};

pub fn add_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "add",
        "adds two numbers",
        json!({
            "type": "object",
            "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
            "required": ["a", "b"]
        }),
    )
}

/// What a [`FakeSession`] observed.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub initialized: bool,
    pub closed: bool,
    pub list_calls: usize,
    pub calls: Vec<(String, Option<ToolArguments>)>,
}

pub struct FakeSession {
    tools: Vec<ToolDescriptor>,
    results: HashMap<String, ToolCallResult>,
    log: Arc<Mutex<SessionLog>>,
}

impl FakeSession {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            results: HashMap::new(),
            log: Arc::default(),
        }
    }

    pub fn with_result(mut self, tool: &str, result: ToolCallResult) -> Self {
        self.results.insert(tool.to_string(), result);
        self
    }

    pub fn log(&self) -> Arc<Mutex<SessionLog>> {
        Arc::clone(&self.log)
    }

    fn ensure_open(&self) -> mcp::Result<()> {
        let log = self.log.lock().unwrap();
        if log.closed {
            Err(mcp::Error::Closed)
        } else if !log.initialized {
            Err(mcp::Error::NotInitialized)
        } else {
            Ok(())
        }
    }
}

impl ToolSession for FakeSession {
    async fn initialize(&mut self) -> mcp::Result<ServerInfo> {
        let mut log = self.log.lock().unwrap();
        if log.closed {
            return Err(mcp::Error::Closed);
        }
        log.initialized = true;
        Ok(ServerInfo {
            name: "fake".into(),
            version: "0.0.0".into(),
        })
    }

    async fn list_tools(&self) -> mcp::Result<Vec<ToolDescriptor>> {
        self.ensure_open()?;
        self.log.lock().unwrap().list_calls += 1;
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> mcp::Result<ToolCallResult> {
        self.ensure_open()?;
        self.log
            .lock()
            .unwrap()
            .calls
            .push((name.to_string(), arguments));
        self.results
            .get(name)
            .cloned()
            .ok_or_else(|| mcp::Error::Service(format!("unknown tool: {name}")))
    }

    async fn close(&mut self) -> mcp::Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// A request as a [`ScriptedBackend`] received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub tool_choice: ToolChoice,
}

/// Replays canned assistant messages in order.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Message>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedBackend {
    pub fn new(responses: impl IntoIterator<Item = Message>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tool_names: request
                .tools
                .iter()
                .map(|t| t.function.name.clone())
                .collect(),
            tool_choice: request.tool_choice,
        });

        let message = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ModelError::InvalidResponse("script exhausted".into()))?;

        let finish_reason = if message.has_tool_calls() {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };

        Ok(ModelResponse {
            message,
            finish_reason,
            usage: Usage::default(),
        })
    }
}
