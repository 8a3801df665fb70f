//! Configuration loading from toolbridge.toml and the environment.

use mcp::ServerParams;
use runtime::{
    AzureAuth, AzureOpenAiBackend, DEFAULT_API_VERSION, DEFAULT_DEPLOYMENT, DEFAULT_ENDPOINT,
};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "toolbridge.toml";

pub const API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";
pub const AD_TOKEN_ENV: &str = "AZURE_OPENAI_AD_TOKEN";
pub const ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";
pub const API_VERSION_ENV: &str = "AZURE_OPENAI_API_VERSION";
pub const DEPLOYMENT_ENV: &str = "AZURE_OPENAI_DEPLOYMENT";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Tool server to launch.
    #[serde(default)]
    pub server: ServerParams,

    /// Chat completion backend.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Azure OpenAI backend configuration.
///
/// Unset fields fall back to the environment, then to built-in defaults.
#[derive(Debug, Default, Deserialize)]
pub struct BackendConfig {
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
    pub deployment: Option<String>,

    /// Resource API key. Mutually exclusive with ad_token.
    pub api_key: Option<String>,

    /// Entra ID bearer token. Mutually exclusive with api_key.
    pub ad_token: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `path` if given, else `toolbridge.toml` when present, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Build the authentication from config, or from the environment when
    /// the config sets neither credential.
    pub fn auth(&self, env: impl Fn(&str) -> Option<String>) -> Result<AzureAuth, ConfigError> {
        let (api_key, ad_token) = match (&self.backend.api_key, &self.backend.ad_token) {
            (None, None) => (env(API_KEY_ENV), env(AD_TOKEN_ENV)),
            (key, token) => (key.clone(), token.clone()),
        };

        match (api_key, ad_token) {
            (Some(key), None) => Ok(AzureAuth::ApiKey(key)),
            (None, Some(token)) => Ok(AzureAuth::AdToken(token)),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousAuth),
            (None, None) => Err(ConfigError::MissingAuth),
        }
    }

    /// Build the chat backend. `deployment` overrides every other source.
    pub fn backend(
        &self,
        deployment: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<AzureOpenAiBackend, ConfigError> {
        let auth = self.auth(&env)?;
        let settings = &self.backend;

        let endpoint = settings
            .endpoint
            .clone()
            .or_else(|| env(ENDPOINT_ENV))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let api_version = settings
            .api_version
            .clone()
            .or_else(|| env(API_VERSION_ENV))
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let deployment = deployment
            .map(str::to_string)
            .or_else(|| settings.deployment.clone())
            .or_else(|| env(DEPLOYMENT_ENV))
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string());

        Ok(AzureOpenAiBackend::builder(auth)
            .endpoint(endpoint)
            .api_version(api_version)
            .deployment(deployment)
            .build())
    }
}

/// Reads a variable from the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error(
        "authentication not configured: set backend.api_key, backend.ad_token, AZURE_OPENAI_API_KEY or AZURE_OPENAI_AD_TOKEN"
    )]
    MissingAuth,

    #[error("ambiguous authentication: set either an api key OR an ad token, not both")]
    AmbiguousAuth,
}
