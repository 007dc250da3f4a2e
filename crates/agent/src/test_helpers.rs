//! Shared test helpers: scripted providers and capabilities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use taskloom_core::capability::{ActionDescriptor, ActionId, Capability};
use taskloom_core::error::{CapabilityError, ProviderError};
use taskloom_core::provider::{FunctionSchema, Provider, ProviderRequest, ProviderResponse};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    call_count: Mutex<usize>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
        }
    }

    /// Create a provider that returns a single text response.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![ProviderResponse::text(text)])
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let response = responses[*count].clone();
        *count += 1;
        Ok(response)
    }
}

/// A provider that records every request it receives.
///
/// Scripted responses are returned in order; once they run out the fallback
/// (if any) is returned for every further call.
pub struct RecordingProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    fallback: Option<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RecordingProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with `text`.
    pub fn replying(text: &str) -> Self {
        Self {
            fallback: Some(ProviderResponse::text(text)),
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| ProviderError::MalformedResponse("no scripted response left".into()))
    }
}

/// A provider that fails every call.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// A provider that never answers.
pub struct StallingProvider;

#[async_trait]
impl Provider for StallingProvider {
    fn name(&self) -> &str {
        "stalling_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

/// A capability that records its arguments and returns a fixed result.
pub struct RecordingCapability {
    reply: String,
    failure: Mutex<Option<CapabilityError>>,
    calls: Mutex<Vec<serde_json::Value>>,
}

impl RecordingCapability {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail the first call with `error`; later calls succeed.
    pub fn failing(error: CapabilityError) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
            ..Self::replying("")
        }
    }

    pub fn calls(&self) -> Vec<serde_json::Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Capability for RecordingCapability {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<String, CapabilityError> {
        self.calls.lock().unwrap().push(arguments);
        match self.failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(self.reply.clone()),
        }
    }
}

/// A capability that never finishes.
pub struct StallingCapability;

#[async_trait]
impl Capability for StallingCapability {
    async fn invoke(&self, _arguments: serde_json::Value) -> Result<String, CapabilityError> {
        std::future::pending().await
    }
}

/// A plannable capability that answers `<id> done`.
pub fn echo_descriptor(id: ActionId) -> ActionDescriptor {
    echo_descriptor_with(id, Arc::new(RecordingCapability::replying(&format!("{id} done"))))
}

pub fn echo_descriptor_with(id: ActionId, capability: Arc<dyn Capability>) -> ActionDescriptor {
    ActionDescriptor::capability(
        id,
        format!("The assistant replies with the action \"{id}\"."),
        Some(FunctionSchema {
            name: id.to_string(),
            description: format!("Run {id}"),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } }
            }),
        }),
        capability,
    )
}
