//! Chat completion provider adapters.
//!
//! Each provider implements the backend trait for its specific API.

mod azure_openai;

pub use azure_openai::{
    AzureAuth, AzureOpenAiBackend, AzureOpenAiBackendBuilder, DEFAULT_API_VERSION,
    DEFAULT_DEPLOYMENT, DEFAULT_ENDPOINT,
};
