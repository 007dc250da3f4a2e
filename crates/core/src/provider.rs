//! Provider trait — the abstraction over completion backends.
//!
//! A Provider takes an ordered list of transcript entries, optionally a set of
//! function schemas and a forced function choice, and returns either text or a
//! chosen function with JSON-encoded arguments.
//!
//! Implementations: OpenAI-compatible endpoints (OpenAI, LocalAI, vLLM, Ollama).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::transcript::Entry;

/// Default ceiling for a single completion call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1200);

/// A function definition sent to the provider so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// The function name
    pub name: String,

    /// Description of what the function does
    pub description: String,

    /// JSON Schema describing the function's parameters
    pub parameters: serde_json::Value,
}

/// How the provider may pick a function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionChoice {
    /// The provider decides whether to call a function
    #[default]
    Auto,
    /// The provider must answer with text
    None,
    /// The provider must call the named function
    Force(String),
}

/// A function chosen by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,

    /// Arguments as a JSON-encoded string, exactly as the provider returned them
    pub arguments: String,
}

/// A completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use
    pub model: String,

    /// Ordered, role-tagged messages
    pub messages: Vec<Entry>,

    /// Functions the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionSchema>,

    #[serde(default)]
    pub function_call: FunctionChoice,

    /// Temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on the whole request-response exchange
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
}

impl ProviderRequest {
    /// A plain text completion over `messages`.
    pub fn text(model: impl Into<String>, messages: Vec<Entry>) -> Self {
        Self {
            model: model.into(),
            messages,
            functions: Vec::new(),
            function_call: FunctionChoice::Auto,
            temperature: default_temperature(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A completion that must call `function`.
    pub fn forced(model: impl Into<String>, messages: Vec<Entry>, function: FunctionSchema) -> Self {
        let name = function.name.clone();
        Self {
            functions: vec![function],
            function_call: FunctionChoice::Force(name),
            ..Self::text(model, messages)
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text, if any
    #[serde(default)]
    pub content: Option<String>,

    /// The function the model chose, if any
    #[serde(default)]
    pub function_call: Option<FunctionCall>,

    /// Which model actually responded
    #[serde(default)]
    pub model: String,

    /// Token usage statistics
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ProviderResponse {
    /// A text-only response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A response that calls `name` with `arguments`.
    pub fn function(name: impl Into<String>, arguments: &serde_json::Value) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.to_string(),
            }),
            ..Self::default()
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings.
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,
}

/// The core Provider trait.
///
/// The agent treats a provider as a pure function with latency and a failure
/// mode: every call either returns a full response or an error.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "localai", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Generate embeddings for the given texts.
    ///
    /// Default implementation returns an error indicating embeddings aren't supported.
    async fn embed(
        &self,
        _request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Provider '{}' does not support embeddings",
            self.name()
        )))
    }
}
