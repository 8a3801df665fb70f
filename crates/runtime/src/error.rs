use thiserror::Error;

use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] mcp::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid arguments for tool {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("tool {0} returned no text content")]
    EmptyToolResult(String),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
