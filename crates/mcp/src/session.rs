//! Session capability trait.

use std::future::Future;

use crate::{Result, ServerInfo, ToolArguments, ToolCallResult, ToolDescriptor};

/// A handshake-initialized channel to a tool server.
///
/// One implementation per transport. Flows are written against this trait so
/// they never touch subprocess details directly.
///
/// Lifecycle: `initialize` must succeed before `list_tools`/`call_tool`
/// (otherwise [`Error::NotInitialized`](crate::Error::NotInitialized)); after
/// `close` every call fails with [`Error::Closed`](crate::Error::Closed).
pub trait ToolSession: Send + Sync {
    /// Perform the protocol handshake.
    fn initialize(&mut self) -> impl Future<Output = Result<ServerInfo>> + Send;

    /// List the tools the server currently exposes.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<ToolDescriptor>>> + Send;

    /// Invoke a tool by name.
    fn call_tool(
        &self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> impl Future<Output = Result<ToolCallResult>> + Send;

    /// Tear down the session and its transport. Idempotent.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
