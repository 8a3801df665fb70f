//! MCP session error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to spawn server: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("session not initialized")]
    NotInitialized,

    #[error("session already initialized")]
    AlreadyInitialized,

    #[error("session closed")]
    Closed,

    #[error("service error: {0}")]
    Service(String),
}

impl From<rmcp::service::ServiceError> for Error {
    fn from(err: rmcp::service::ServiceError) -> Self {
        Self::Service(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
