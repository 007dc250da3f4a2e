//! In-memory backend — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use std::sync::Arc;
use taskloom_core::error::MemoryError;
use taskloom_core::memory::{MemoryBackend, MemoryEntry, MemoryQuery};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::vector::keyword_search;

/// An in-memory backend that stores memories in a Vec and ranks them by
/// keyword overlap. Nothing survives the process.
pub struct InMemoryBackend {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn store(&self, mut entry: MemoryEntry) -> Result<String, MemoryError> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        let id = entry.id.clone();
        self.entries.write().await.push(entry);
        Ok(id)
    }

    async fn search(&self, query: MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(keyword_search(&entries, &query.text, query.limit))
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.entries.read().await.len())
    }
}
