//! A provider bound to one model and its sampling settings.

use std::sync::Arc;
use std::time::Duration;

use taskloom_core::error::ProviderError;
use taskloom_core::provider::{
    DEFAULT_TIMEOUT, FunctionChoice, FunctionSchema, Provider, ProviderRequest, ProviderResponse,
};
use taskloom_core::transcript::Entry;
use tracing::debug;

/// Every component of the loop talks to the provider through one of these.
#[derive(Clone)]
pub struct Completion {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl Completion {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.1,
            timeout: DEFAULT_TIMEOUT,
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

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Free-text completion.
    pub async fn text(&self, messages: Vec<Entry>) -> Result<ProviderResponse, ProviderError> {
        let request = ProviderRequest::text(&self.model, messages);
        self.send(request).await
    }

    /// Completion that must call `name`, chosen from `functions`.
    pub async fn forced(
        &self,
        messages: Vec<Entry>,
        functions: Vec<FunctionSchema>,
        name: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = ProviderRequest {
            functions,
            function_call: FunctionChoice::Force(name.to_string()),
            ..ProviderRequest::text(&self.model, messages)
        };
        self.send(request).await
    }

    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let request = request
            .with_temperature(self.temperature)
            .with_timeout(self.timeout);
        debug!(
            provider = self.provider.name(),
            model = %request.model,
            messages = request.messages.len(),
            function_call = ?request.function_call,
            "Sending completion request"
        );
        // The provider applies the timeout to its own transport; this bounds
        // providers that do not.
        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{RecordingProvider, StallingProvider};

    #[tokio::test]
    async fn requests_carry_model_and_settings() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let completion = Completion::new(provider.clone(), "gpt-4")
            .with_temperature(0.3)
            .with_timeout(Duration::from_secs(7));

        completion.text(vec![Entry::user("hi")]).await.unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.timeout, Duration::from_secs(7));
        assert_eq!(request.function_call, FunctionChoice::Auto);
        assert!(request.functions.is_empty());
    }

    #[tokio::test]
    async fn forced_requests_name_the_function() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let schema = FunctionSchema {
            name: "intent".into(),
            description: "Decide to do an action.".into(),
            parameters: serde_json::json!({"type": "object"}),
        };
        Completion::new(provider.clone(), "functions")
            .forced(vec![Entry::user("hi")], vec![schema.clone()], "intent")
            .await
            .unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.functions, vec![schema]);
        assert_eq!(request.function_call, FunctionChoice::Force("intent".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out() {
        let completion =
            Completion::new(Arc::new(StallingProvider), "gpt-4").with_timeout(Duration::from_secs(3));
        let err = completion.text(vec![Entry::user("hi")]).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(3)));
    }
}
