//! Stdio demo: list a server's tools and call `add` once.

use std::io::Write;

use mcp::{SessionGuard, ToolArguments, ToolSession};
use serde_json::json;

use crate::{Error, Result};

pub const DEMO_TOOL: &str = "add";

fn demo_arguments() -> ToolArguments {
    let mut args = ToolArguments::new();
    args.insert("a".into(), json!(2));
    args.insert("b".into(), json!(3));
    args
}

/// Run the demo against `session`, writing its report to `out`.
///
/// The session is closed before returning, whether or not the demo
/// succeeded.
pub async fn run_stdio_demo<S: ToolSession>(session: S, out: &mut impl Write) -> Result<()> {
    let mut session = SessionGuard::new(session);
    let result = demo_steps(&mut session, out).await;
    session.close_with(result).await
}

async fn demo_steps<S: ToolSession>(
    session: &mut SessionGuard<S>,
    out: &mut impl Write,
) -> Result<()> {
    session.initialize().await?;

    let tools = session.list_tools().await?;
    writeln!(out, "Available tools:")?;
    for tool in &tools {
        writeln!(out, "  - {}: {}", tool.name, tool.description_or_empty())?;
    }

    let result = session.call_tool(DEMO_TOOL, Some(demo_arguments())).await?;
    let text = result
        .first_text()
        .ok_or_else(|| Error::EmptyToolResult(DEMO_TOOL.to_string()))?;
    writeln!(out, "2 + 3 = {text}")?;

    Ok(())
}
