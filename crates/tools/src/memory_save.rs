//! Memory save — put a thought into the long-term memory store.

use async_trait::async_trait;
use std::sync::Arc;
use taskloom_core::capability::Capability;
use taskloom_core::error::CapabilityError;
use taskloom_core::memory::{MemoryBackend, MemoryEntry};
use tracing::info;
use uuid::Uuid;

pub struct SaveMemory {
    backend: Arc<dyn MemoryBackend>,
}

impl SaveMemory {
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Capability for SaveMemory {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<String, CapabilityError> {
        let thought = arguments["thought"]
            .as_str()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| CapabilityError::InvalidArguments("Missing 'thought' argument".into()))?;

        let id = self
            .backend
            .store(MemoryEntry::new(Uuid::new_v4().to_string(), thought))
            .await?;

        info!(%id, backend = self.backend.name(), "Saved to memory");
        Ok("The object was saved permanently to memory.".into())
    }
}
