//! OpenAI-compatible provider implementation.
//!
//! Works with: LocalAI, OpenAI, vLLM, Ollama, and any endpoint exposing
//! `/chat/completions` with the `functions` + `function_call` fields.
//!
//! Supports:
//! - Chat completions with function calling and forced function choice
//! - Per-request timeouts
//! - Embeddings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taskloom_config::AppConfig;
use taskloom_core::error::ProviderError;
use taskloom_core::provider::*;
use taskloom_core::transcript::Entry;
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider. `base_url` includes the `/v1` segment.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("taskloom/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Build from the application config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new("openai-compat", &config.api_base, config.api_key_or_placeholder())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert transcript entries to OpenAI API format.
    fn to_api_messages(entries: &[Entry]) -> Vec<ApiMessage> {
        entries
            .iter()
            .map(|entry| match entry {
                Entry::User { content } => ApiMessage::plain("user", content),
                Entry::System { content } => ApiMessage::plain("system", content),
                Entry::Function { name, content } => ApiMessage {
                    name: Some(name.to_string()),
                    ..ApiMessage::plain("function", content)
                },
                Entry::Assistant {
                    content,
                    function_call,
                } => ApiMessage {
                    role: "assistant".into(),
                    content: content.clone(),
                    name: None,
                    function_call: function_call.as_ref().map(|call| ApiFunctionCall {
                        name: call.action.to_string(),
                        arguments: serde_json::Value::String(call.arguments.to_string()),
                    }),
                    tool_calls: None,
                },
            })
            .collect()
    }

    fn function_call_field(choice: &FunctionChoice) -> serde_json::Value {
        match choice {
            FunctionChoice::Auto => serde_json::json!("auto"),
            FunctionChoice::None => serde_json::json!("none"),
            FunctionChoice::Force(name) => serde_json::json!({ "name": name }),
        }
    }

    /// Build the JSON body for `/chat/completions`.
    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if !request.functions.is_empty() {
            body["functions"] = serde_json::json!(request.functions);
            body["function_call"] = Self::function_call_field(&request.function_call);
        }

        body
    }

    fn map_send_error(err: reqwest::Error, timeout: std::time::Duration) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(timeout.as_secs())
        } else {
            ProviderError::Network(err.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }

    /// Turn a decoded API response into a provider response.
    fn from_api_response(api_response: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        let message = choice.message;
        let function_call = message
            .function_call
            .or_else(|| {
                message
                    .tool_calls
                    .and_then(|calls| calls.into_iter().next())
                    .map(|tc| tc.function)
            })
            .map(|fc| FunctionCall {
                name: fc.name,
                arguments: match fc.arguments {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                },
            });

        Ok(ProviderResponse {
            content: message.content,
            function_call,
            model: api_response.model,
            usage: api_response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl taskloom_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            functions = request.functions.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, request.timeout))?;

        let response = Self::check_status(response).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Self::map_send_error(e, request.timeout))?;

        Self::from_api_response(api_response)
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(&url)
            .timeout(DEFAULT_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, DEFAULT_TIMEOUT))?;

        let response = Self::check_status(response).await?;

        let api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse embedding response: {e}"))
        })?;

        Ok(EmbeddingResponse {
            embeddings: api_resp.data.into_iter().map(|d| d.embedding).collect(),
            model: api_resp.model,
        })
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<ApiFunctionCall>,
    #[serde(default, skip_serializing)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

impl ApiMessage {
    fn plain(role: &str, content: &str) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            name: None,
            function_call: None,
            tool_calls: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    /// A JSON-encoded string per the API; some servers send an object
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    function: ApiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
