//! Tool descriptor → chat API function schema.

use mcp::ToolDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function the model may call, in the chat API's `tools` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    #[serde(rename = "type")]
    pub kind: FunctionKind,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    #[default]
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// The tool's input schema, verbatim.
    pub parameters: Value,
}

impl From<&ToolDescriptor> for FunctionSchema {
    fn from(tool: &ToolDescriptor) -> Self {
        Self {
            kind: FunctionKind::Function,
            function: FunctionDefinition {
                name: tool.name.clone(),
                description: tool.description_or_empty().to_string(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

/// Translate a tool listing into function schemas, preserving order.
pub fn function_schemas(tools: &[ToolDescriptor]) -> Vec<FunctionSchema> {
    tools.iter().map(FunctionSchema::from).collect()
}
