//! Chat bridging: let a hosted model call tools exposed by a session.
//!
//! One query is resolved in at most two completions. The first offers every
//! listed tool with tool choice `auto`; if the model asks for tools, each
//! call is executed through the session and its output appended as a `tool`
//! message, then a final completion runs with tool choice `none`.

use std::io::Write;

use mcp::{SessionGuard, ToolArguments, ToolSession};
use tracing::{debug, info, warn};

use crate::model::{Backend, Message, ModelRequest, ModelResponse, Role, ToolCall, ToolChoice};
use crate::schema::{FunctionSchema, function_schemas};
use crate::{Error, Result};

/// Where an exchange stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeState {
    /// Waiting for the completion that may request tools.
    AwaitingFirstResponse,
    /// Tool outputs appended; waiting for the text-only completion.
    AwaitingFinalResponse,
    /// Terminal. Holds the answer returned to the caller.
    Finished(String),
}

/// The transcript of one query and the state it reached.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub messages: Vec<Message>,
    pub state: BridgeState,
}

impl Exchange {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(query)],
            state: BridgeState::AwaitingFirstResponse,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, BridgeState::Finished(_))
    }

    /// The final answer, once finished.
    pub fn answer(&self) -> Option<&str> {
        match &self.state {
            BridgeState::Finished(answer) => Some(answer.as_str()),
            _ => None,
        }
    }

    /// Messages with the given role.
    pub fn messages_with_role(&self, role: Role) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.role == role)
    }
}

/// A chat backend wired to a tool session.
pub struct ChatBridge<B: Backend, S: ToolSession> {
    backend: B,
    session: SessionGuard<S>,
}

impl<B: Backend, S: ToolSession> ChatBridge<B, S> {
    /// Initialize the session and print the tools it exposes.
    ///
    /// The session is closed again if any step fails.
    pub async fn connect(backend: B, session: S, out: &mut impl Write) -> Result<Self> {
        let mut session = SessionGuard::new(session);

        if let Err(err) = announce_tools(&mut session, out).await {
            if let Err(close_err) = session.close().await {
                warn!(%close_err, "failed to close session after connect error");
            }
            return Err(err);
        }

        Ok(Self { backend, session })
    }

    /// Current tool listing as function schemas.
    pub async fn function_schemas(&self) -> Result<Vec<FunctionSchema>> {
        let tools = self.session.list_tools().await?;
        Ok(function_schemas(&tools))
    }

    /// Answer `query`, resolving at most one round of tool calls.
    pub async fn process_query(&self, query: &str) -> Result<String> {
        let exchange = self.run_exchange(query).await?;
        Ok(exchange.answer().unwrap_or_default().to_string())
    }

    /// Drive a full exchange and return its transcript.
    pub async fn run_exchange(&self, query: &str) -> Result<Exchange> {
        let tools = self.function_schemas().await?;
        let mut exchange = Exchange::new(query);

        while !exchange.is_finished() {
            self.step(&mut exchange, &tools).await?;
        }

        Ok(exchange)
    }

    /// Advance `exchange` by one transition. A finished exchange is left as is.
    pub async fn step(&self, exchange: &mut Exchange, tools: &[FunctionSchema]) -> Result<()> {
        let next = match exchange.state {
            BridgeState::AwaitingFirstResponse => {
                let response = self
                    .complete(&exchange.messages, tools, ToolChoice::Auto)
                    .await?;
                let message = response.message;

                if !message.has_tool_calls() {
                    let answer = message.text_or_empty().to_string();
                    exchange.messages.push(message);
                    BridgeState::Finished(answer)
                } else {
                    let calls = message.tool_calls.clone();
                    exchange.messages.push(message);
                    for call in &calls {
                        let output = self.execute(call).await?;
                        exchange.messages.push(Message::tool_result(&call.id, output));
                    }
                    BridgeState::AwaitingFinalResponse
                }
            }
            BridgeState::AwaitingFinalResponse => {
                let response = self
                    .complete(&exchange.messages, tools, ToolChoice::None)
                    .await?;
                let message = response.message;

                if message.has_tool_calls() {
                    warn!(
                        count = message.tool_calls.len(),
                        "ignoring tool calls in final response"
                    );
                }
                let answer = message.text_or_empty().to_string();
                exchange.messages.push(message);
                BridgeState::Finished(answer)
            }
            BridgeState::Finished(_) => return Ok(()),
        };

        debug!(from = ?exchange.state, to = ?next, "bridge transition");
        exchange.state = next;
        Ok(())
    }

    /// Close the session. Later queries fail.
    pub async fn cleanup(&mut self) -> Result<()> {
        self.session.close().await?;
        Ok(())
    }

    /// Close the session and pass `result` through.
    pub async fn finish<T>(mut self, result: Result<T>) -> Result<T> {
        self.session.close_with(result).await
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[FunctionSchema],
        tool_choice: ToolChoice,
    ) -> Result<ModelResponse> {
        let request = ModelRequest {
            messages,
            tools,
            tool_choice,
        };
        Ok(self.backend.call(request).await?)
    }

    async fn execute(&self, call: &ToolCall) -> Result<String> {
        let arguments: ToolArguments =
            serde_json::from_str(&call.arguments).map_err(|source| Error::InvalidArguments {
                tool: call.name.clone(),
                source,
            })?;

        info!(tool = %call.name, id = %call.id, "executing tool call");
        let result = self.session.call_tool(&call.name, Some(arguments)).await?;
        if result.is_error {
            warn!(tool = %call.name, "tool reported an error, forwarding its output");
        }

        result
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| Error::EmptyToolResult(call.name.clone()))
    }
}

async fn announce_tools<S: ToolSession>(
    session: &mut SessionGuard<S>,
    out: &mut impl Write,
) -> Result<()> {
    session.initialize().await?;
    let tools = session.list_tools().await?;

    writeln!(out, "\nConnected to server with tools:")?;
    for tool in &tools {
        writeln!(out, "  - {}: {}", tool.name, tool.description_or_empty())?;
    }
    Ok(())
}
