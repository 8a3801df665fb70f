//! Toolbridge runtime — demo flows and chat-completion tool bridging.
//!
//! This crate drives a [`mcp::ToolSession`] either directly (the stdio demo)
//! or on behalf of a hosted chat model (the chat bridge).
//!
//! # Overview
//!
//! - **Backend**: a trait abstracting chat completion providers
//!   ([`AzureOpenAiBackend`] is the bundled one).
//! - **FunctionSchema**: a tool descriptor in the provider's `tools` format.
//! - **ChatBridge**: resolves one query with at most one round of tool calls.
//!
//! # Example
//!
//! ```ignore
//! use mcp::{ServerParams, StdioSession};
//! use runtime::{AzureAuth, AzureOpenAiBackend, ChatBridge};
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = AzureOpenAiBackend::builder(AzureAuth::ApiKey("...".into())).build();
//! let session = StdioSession::spawn(&ServerParams::default())?;
//! let mut stdout = std::io::stdout();
//!
//! let bridge = ChatBridge::connect(backend, session, &mut stdout).await?;
//! let result = bridge.process_query("Is there a vacation policy?").await;
//! let answer = bridge.finish(result).await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

mod bridge;
mod demo;
mod error;
pub mod model;
mod providers;
mod schema;

#[cfg(test)]
mod testing;

pub use bridge::{BridgeState, ChatBridge, Exchange};
pub use demo::{DEMO_TOOL, run_stdio_demo};
pub use error::{Error, Result};
pub use model::{Backend, Message, ModelError, Role, ToolCall, ToolChoice};
pub use providers::{
    AzureAuth, AzureOpenAiBackend, AzureOpenAiBackendBuilder, DEFAULT_API_VERSION,
    DEFAULT_DEPLOYMENT, DEFAULT_ENDPOINT,
};
pub use schema::{FunctionDefinition, FunctionKind, FunctionSchema, function_schemas};
