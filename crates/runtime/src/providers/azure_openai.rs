//! Azure OpenAI chat completions backend.

use crate::model::{
    Backend, FinishReason, Message, ModelError, ModelRequest, ModelResponse, Role, ToolCall,
    ToolChoice, Usage,
};
use crate::schema::FunctionSchema;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://bacsysai.openai.azure.com/";
pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o";

/// Authentication mode for Azure OpenAI.
///
/// Use `ApiKey` for resource keys, `AdToken` for Microsoft Entra ID bearer
/// tokens.
#[derive(Debug, Clone)]
pub enum AzureAuth {
    ApiKey(String),
    AdToken(String),
}

impl std::fmt::Display for AzureAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "api_key"),
            Self::AdToken(_) => write!(f, "ad_token"),
        }
    }
}

impl AzureAuth {
    fn apply_headers(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Self::ApiKey(key) => req.header("api-key", key),
            Self::AdToken(token) => req.header("Authorization", format!("Bearer {token}")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [FunctionSchema]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: Role,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: ApiFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Azure OpenAI backend.
#[derive(Debug, Clone)]
pub struct AzureOpenAiBackendBuilder {
    auth: AzureAuth,
    endpoint: String,
    api_version: String,
    deployment: String,
}

impl AzureOpenAiBackendBuilder {
    pub fn new(auth: AzureAuth) -> Self {
        Self {
            auth,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            deployment: DEFAULT_DEPLOYMENT.to_string(),
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = deployment.into();
        self
    }

    pub fn build(self) -> AzureOpenAiBackend {
        AzureOpenAiBackend {
            client: reqwest::Client::new(),
            auth: self.auth,
            endpoint: self.endpoint,
            api_version: self.api_version,
            deployment: self.deployment,
        }
    }
}

/// Azure OpenAI chat completions backend.
pub struct AzureOpenAiBackend {
    client: reqwest::Client,
    auth: AzureAuth,
    endpoint: String,
    api_version: String,
    deployment: String,
}

impl AzureOpenAiBackend {
    pub fn builder(auth: AzureAuth) -> AzureOpenAiBackendBuilder {
        AzureOpenAiBackendBuilder::new(auth)
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    fn message_to_api(msg: &Message) -> ApiMessage {
        ApiMessage {
            role: msg.role,
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| ApiToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: ApiFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn build_request<'a>(&'a self, request: &ModelRequest<'a>) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.deployment,
            messages: request.messages.iter().map(Self::message_to_api).collect(),
            // tool_choice without tools is rejected by the API
            tools: (!request.tools.is_empty()).then_some(request.tools),
            tool_choice: (!request.tools.is_empty()).then_some(request.tool_choice),
        }
    }

    fn response_from_api(api_response: ApiResponse) -> Result<ModelResponse, ModelError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        let usage = api_response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ModelResponse {
            message: Message::assistant_tool_calls(choice.message.content, tool_calls),
            finish_reason: choice
                .finish_reason
                .as_deref()
                .map(FinishReason::from)
                .unwrap_or_default(),
            usage,
        })
    }
}

impl std::fmt::Display for AzureOpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "azure-openai({}, auth={})",
            self.deployment, self.auth
        )
    }
}

impl Backend for AzureOpenAiBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = self.build_request(&request);
        debug!(
            deployment = %self.deployment,
            messages = api_request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion"
        );

        let req = self
            .client
            .post(self.completions_url())
            .header("content-type", "application/json")
            .header("accept", "application/json");

        let req = self.auth.apply_headers(req);

        let response = req
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let response = Self::response_from_api(api_response)?;
        debug!(
            finish_reason = ?response.finish_reason,
            tool_calls = response.message.tool_calls.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "chat completion received"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use mcp::ToolDescriptor;
    use serde_json::json;

    fn backend(endpoint: &str) -> AzureOpenAiBackend {
        AzureOpenAiBackend::builder(AzureAuth::ApiKey("test-key".into()))
            .endpoint(endpoint)
            .build()
    }

    fn add_schema() -> Vec<FunctionSchema> {
        vec![FunctionSchema::from(&ToolDescriptor::new(
            "add",
            "adds",
            json!({"type": "object"}),
        ))]
    }

    #[test]
    fn auth_display() {
        assert_eq!(AzureAuth::ApiKey("k".into()).to_string(), "api_key");
        assert_eq!(AzureAuth::AdToken("t".into()).to_string(), "ad_token");
    }

    #[test]
    fn completions_url_uses_deployment() {
        let backend = backend("https://example.openai.azure.com/");
        assert_eq!(
            backend.completions_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-12-01-preview"
        );
        assert_eq!(backend.to_string(), "azure-openai(gpt-4o, auth=api_key)");
    }

    #[test]
    fn request_serializes_tool_exchange() {
        let backend = backend(DEFAULT_ENDPOINT);
        let messages = vec![
            Message::user("what is 2 + 3?"),
            Message::assistant_tool_calls(
                None,
                vec![ToolCall::new("call_1", "add", r#"{"a":2,"b":3}"#)],
            ),
            Message::tool_result("call_1", "5"),
        ];
        let tools = add_schema();
        let request = ModelRequest {
            messages: &messages,
            tools: &tools,
            tool_choice: ToolChoice::None,
        };

        let body = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["tool_choice"], "none");
        assert_eq!(body["tools"][0]["function"]["name"], "add");
        assert_eq!(
            body["messages"],
            json!([
                {"role": "user", "content": "what is 2 + 3?"},
                {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "add", "arguments": "{\"a\":2,\"b\":3}"}
                    }]
                },
                {"role": "tool", "content": "5", "tool_call_id": "call_1"}
            ])
        );
    }

    #[test]
    fn request_without_tools_omits_tool_fields() {
        let backend = backend(DEFAULT_ENDPOINT);
        let messages = vec![Message::user("hi")];
        let request = ModelRequest {
            messages: &messages,
            tools: &[],
            tool_choice: ToolChoice::Auto,
        };

        let body = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn parses_tool_call_response() {
        let api: ApiResponse = serde_json::from_value(json!({
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "get_policy", "arguments": "{\"x\":1}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }))
        .unwrap();

        let response = AzureOpenAiBackend::response_from_api(api).unwrap();
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(
            response.message.tool_calls,
            vec![ToolCall::new("call_9", "get_policy", r#"{"x":1}"#)]
        );
        assert_eq!(response.usage.total_tokens(), 15);
    }

    #[test]
    fn empty_choices_is_invalid() {
        let api: ApiResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            AzureOpenAiBackend::response_from_api(api),
            Err(ModelError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn call_posts_to_deployment() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/gpt-4o/chat/completions")
                    .query_param("api-version", DEFAULT_API_VERSION)
                    .header("api-key", "test-key");
                then.status(200).json_body(json!({
                    "choices": [{
                        "finish_reason": "stop",
                        "message": {"role": "assistant", "content": "hello"}
                    }]
                }));
            })
            .await;

        let backend = backend(&server.base_url());
        let messages = vec![Message::user("hi")];
        let response = backend
            .call(ModelRequest {
                messages: &messages,
                tools: &[],
                tool_choice: ToolChoice::Auto,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.message.text_or_empty(), "hello");
        assert!(!response.message.has_tool_calls());
    }

    #[tokio::test]
    async fn error_status_maps_to_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(401).body("access denied");
            })
            .await;

        let backend = backend(&server.base_url());
        let messages = vec![Message::user("hi")];
        let err = backend
            .call(ModelRequest {
                messages: &messages,
                tools: &[],
                tool_choice: ToolChoice::Auto,
            })
            .await
            .unwrap_err();

        match err {
            ModelError::Api(msg) => {
                assert!(msg.starts_with("401"));
                assert!(msg.contains("access denied"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }
}
