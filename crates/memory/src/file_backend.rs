//! File-based memory backend — persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded `MemoryEntry`, embedding included when one
//! was computed. Storage location: `~/.taskloom/memories.jsonl` by default.
//!
//! With an embedding provider attached, search fuses embedding similarity
//! and keyword overlap; without one it falls back to keywords alone.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskloom_core::error::MemoryError;
use taskloom_core::memory::{MemoryBackend, MemoryEntry, MemoryQuery};
use taskloom_core::provider::{EmbeddingRequest, Provider};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::vector::{keyword_search, reciprocal_rank_fusion, vector_search};

/// Turns text into embedding vectors through a provider's `/embeddings` endpoint.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(|e| MemoryError::EmbeddingFailed(e.to_string()))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::EmbeddingFailed("empty embedding response".into()))
    }
}

/// A file-backed memory store using JSONL (one JSON object per line).
///
/// Entries are loaded into memory on creation and flushed to disk on every
/// store, so a write is durable before the next query runs.
pub struct FileBackend {
    path: PathBuf,
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
    embedder: Option<Embedder>,
}

impl FileBackend {
    /// Create a new file-based backend at the given path.
    ///
    /// If the file exists, entries are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn new(path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "File memory backend loaded");
        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
            embedder: None,
        }
    }

    /// Attach an embedding provider for similarity search.
    pub fn with_embedder(mut self, embedder: Embedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load entries from a JSONL file.
    fn load_from_disk(path: &Path) -> Vec<MemoryEntry> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(), // Not created yet
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<MemoryEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory entry");
                    None
                }
            })
            .collect()
    }

    /// Write `entries` to disk as JSONL, replacing the file.
    fn flush(&self, entries: &[MemoryEntry]) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for entry in entries.iter() {
            let line = serde_json::to_string(entry).map_err(|e| {
                MemoryError::Storage(format!("Failed to serialize memory entry: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))?;

        Ok(())
    }

    /// Embed `text`, logging and returning `None` when the provider fails.
    async fn try_embed(&self, text: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(text).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "Embedding failed, falling back to keyword matching");
                None
            }
        }
    }
}

#[async_trait]
impl MemoryBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn store(&self, mut entry: MemoryEntry) -> Result<String, MemoryError> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        if entry.embedding.is_none() {
            entry.embedding = self.try_embed(&entry.content).await;
        }
        let id = entry.id.clone();

        // Only entries that reached the disk become visible to queries.
        let mut entries = self.entries.write().await;
        entries.push(entry);
        if let Err(e) = self.flush(&entries) {
            entries.pop();
            return Err(e);
        }
        Ok(id)
    }

    async fn search(&self, query: MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        let query_embedding = self.try_embed(&query.text).await;
        let entries = self.entries.read().await;

        let keyword = keyword_search(&entries, &query.text, query.limit);
        let results = match query_embedding {
            Some(embedding) => {
                let vector = vector_search(&entries, &embedding, query.limit, 0.0);
                reciprocal_rank_fusion(&keyword, &vector, 60, query.limit)
            }
            None => keyword,
        };

        debug!(query = %query.text, hits = results.len(), "Memory search");
        Ok(results)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use taskloom_core::error::ProviderError;
    use taskloom_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};
    use tempfile::NamedTempFile;

    /// Embeds by counting a few marker words, so similarity is predictable.
    struct MarkerEmbedder;

    #[async_trait]
    impl Provider for MarkerEmbedder {
        fn name(&self) -> &str {
            "marker"
        }

        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("embeddings only".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            let embeddings = request
                .inputs
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    ["cat", "dog", "car"]
                        .iter()
                        .map(|m| t.matches(m).count() as f32)
                        .collect()
                })
                .collect();
            Ok(EmbeddingResponse {
                embeddings,
                model: request.model,
            })
        }
    }

    fn temp_path() -> PathBuf {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp); // Close file so backend can use it
        path
    }

    #[tokio::test]
    async fn store_persists_across_reload() {
        let path = temp_path();

        let mem = FileBackend::new(path.clone());
        let id = mem.store(MemoryEntry::new("", "Rust is great")).await.unwrap();
        assert!(!id.is_empty());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Rust is great"));

        let mem2 = FileBackend::new(path);
        assert_eq!(mem2.count().await.unwrap(), 1);
        let hits = mem2.search(MemoryQuery::new("rust")).await.unwrap();
        assert_eq!(hits[0].id, id);
    }

    #[tokio::test]
    async fn search_finds_by_keyword() {
        let mem = FileBackend::new(temp_path());
        mem.store(MemoryEntry::new("", "The user prefers Rust"))
            .await
            .unwrap();
        mem.store(MemoryEntry::new("", "Python is also good"))
            .await
            .unwrap();
        mem.store(MemoryEntry::new("", "Rust has great performance"))
            .await
            .unwrap();

        let results = mem.search(MemoryQuery::new("rust")).await.unwrap();
        assert_eq!(results.len(), 2);
        for r in &results {
            assert!(r.content.to_lowercase().contains("rust"));
        }
    }

    #[tokio::test]
    async fn embedder_vectors_are_stored_and_used() {
        let path = temp_path();
        let embedder = Embedder::new(Arc::new(MarkerEmbedder), "test-embed");
        let mem = FileBackend::new(path.clone()).with_embedder(embedder);

        mem.store(MemoryEntry::new("pet", "my cat sleeps all day"))
            .await
            .unwrap();
        mem.store(MemoryEntry::new("ride", "the car needs new tires"))
            .await
            .unwrap();

        // No shared keywords, but the embedding points at the cat memory
        let results = mem.search(MemoryQuery::new("cats").with_limit(1)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "pet");

        let reloaded = FileBackend::new(path);
        let raw = std::fs::read_to_string(reloaded.path()).unwrap();
        assert!(raw.contains("embedding"));
    }

    #[tokio::test]
    async fn failing_embedder_falls_back_to_keywords() {
        struct NoEmbeddings;

        #[async_trait]
        impl Provider for NoEmbeddings {
            fn name(&self) -> &str {
                "none"
            }
            async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
                Err(ProviderError::Network("down".into()))
            }
        }

        let mem = FileBackend::new(temp_path())
            .with_embedder(Embedder::new(Arc::new(NoEmbeddings), "x"));
        mem.store(MemoryEntry::new("", "deploy on fridays"))
            .await
            .unwrap();
        let results = mem.search(MemoryQuery::new("fridays")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].embedding.is_none());
    }

    #[tokio::test]
    async fn handles_missing_file_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let mem = FileBackend::new(dir.path().join("nested").join("memories.jsonl"));
        assert_eq!(mem.count().await.unwrap(), 0);
        mem.store(MemoryEntry::new("", "creates parents")).await.unwrap();
        assert!(mem.path().exists());
    }

    #[tokio::test]
    async fn failed_write_is_not_observable() {
        let blocker = NamedTempFile::new().unwrap();
        let mem = FileBackend::new(blocker.path().join("memories.jsonl"));

        let result = mem.store(MemoryEntry::new("", "never reaches the disk")).await;

        assert!(matches!(result, Err(MemoryError::Storage(_))));
        assert_eq!(mem.count().await.unwrap(), 0);
        assert!(mem.search(MemoryQuery::new("disk")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn handles_corrupted_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"id":"1","content":"valid","created_at":"2026-01-01T00:00:00Z"}}"#).unwrap();
        writeln!(tmp, "this is not json").unwrap();
        writeln!(tmp, r#"{{"id":"2","content":"also valid","created_at":"2026-01-01T00:00:00Z"}}"#).unwrap();

        let mem = FileBackend::new(tmp.path().to_path_buf());
        assert_eq!(mem.count().await.unwrap(), 2);
    }
}
