//! Memory trait — long-term storage the agent can write to and recall from.
//!
//! The agent only needs two operations: put a text under an id, and query for
//! the texts most similar to a search string. How similarity is computed is
//! up to the backend (keyword overlap, embedding cosine, ...).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// A single memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique ID for this memory
    pub id: String,

    /// The content of the memory
    pub content: String,

    /// When this memory was created
    pub created_at: DateTime<Utc>,

    /// Relevance score (set by search operations)
    #[serde(default, skip_serializing)]
    pub score: f32,

    /// Optional embedding vector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryEntry {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created_at: Utc::now(),
            score: 0.0,
            embedding: None,
        }
    }
}

/// A query for searching memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// The search text
    pub text: String,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl MemoryQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: default_limit(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

fn default_limit() -> usize {
    4
}

/// The core MemoryBackend trait.
///
/// A write must be durable before a later `search` can observe it.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// The backend name (e.g., "file", "memory").
    fn name(&self) -> &str;

    /// Store a new memory entry, returning its id.
    async fn store(&self, entry: MemoryEntry) -> std::result::Result<String, MemoryError>;

    /// Search memories, best match first.
    async fn search(&self, query: MemoryQuery) -> std::result::Result<Vec<MemoryEntry>, MemoryError>;

    /// Get total memory count.
    async fn count(&self) -> std::result::Result<usize, MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_query_defaults() {
        let query = MemoryQuery::new("rust programming");
        assert_eq!(query.limit, 4);
        assert_eq!(query.with_limit(10).limit, 10);
    }

    #[test]
    fn memory_entry_serialization_omits_score() {
        let mut entry = MemoryEntry::new("mem_001", "The user prefers Rust over C++");
        entry.score = 0.95;
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("Rust over C++"));
        assert!(!json.contains("score"));
        assert!(!json.contains("embedding"));
    }

    #[test]
    fn memory_entry_keeps_embedding() {
        let mut entry = MemoryEntry::new("mem_002", "vectors");
        entry.embedding = Some(vec![0.5, 0.25]);
        let json = serde_json::to_string(&entry).unwrap();
        let back: MemoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.embedding, Some(vec![0.5, 0.25]));
    }
}
