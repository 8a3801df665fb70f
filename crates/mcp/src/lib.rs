//! MCP (Model Context Protocol) session layer.
//!
//! This crate wraps the official `rmcp` SDK behind a small [`ToolSession`]
//! trait so that flows can list and call tools without knowing how the
//! server is reached. [`StdioSession`] is the child-process implementation.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{ServerParams, SessionGuard, StdioSession, ToolSession};
//!
//! # async fn example() -> mcp::Result<()> {
//! let params = ServerParams::new("python", ["server.py"]);
//! let mut session = SessionGuard::new(StdioSession::spawn(&params)?);
//! session.initialize().await?;
//!
//! for tool in session.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let mut args = mcp::ToolArguments::new();
//! args.insert("a".into(), 2.into());
//! args.insert("b".into(), 3.into());
//! let result = session.call_tool("add", Some(args)).await;
//!
//! session.close().await?;
//! result?;
//! # Ok(())
//! # }
//! ```

mod error;
mod guard;
mod session;
mod stdio;
mod types;

pub use error::{Error, Result};
pub use guard::SessionGuard;
pub use session::ToolSession;
pub use stdio::{DEFAULT_COMMAND, DEFAULT_SCRIPT, ServerParams, StdioSession};
pub use types::{ServerInfo, ToolArguments, ToolCallResult, ToolContent, ToolDescriptor};
