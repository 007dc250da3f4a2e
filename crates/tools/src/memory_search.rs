//! Memory recall — query the long-term memory store.

use async_trait::async_trait;
use std::sync::Arc;
use taskloom_core::capability::Capability;
use taskloom_core::error::CapabilityError;
use taskloom_core::memory::{MemoryBackend, MemoryQuery};
use tracing::debug;

pub struct SearchMemory {
    backend: Arc<dyn MemoryBackend>,
    limit: usize,
}

impl SearchMemory {
    pub fn new(backend: Arc<dyn MemoryBackend>, limit: usize) -> Self {
        Self { backend, limit }
    }
}

#[async_trait]
impl Capability for SearchMemory {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<String, CapabilityError> {
        let query = arguments["reasoning"]
            .as_str()
            .ok_or_else(|| CapabilityError::InvalidArguments("Missing 'reasoning' argument".into()))?;

        let entries = self
            .backend
            .search(MemoryQuery::new(query).with_limit(self.limit))
            .await?;

        debug!(backend = self.backend.name(), hits = entries.len(), "Memory recall");

        let mut out = String::from("Memories found in the database:\n");
        for entry in entries {
            out.push_str("- ");
            out.push_str(&entry.content);
            out.push('\n');
        }
        Ok(out)
    }
}
