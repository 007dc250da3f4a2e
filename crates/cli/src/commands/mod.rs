pub mod actions;
pub mod agent;
pub mod onboard;

use std::sync::Arc;

use taskloom_config::{AppConfig, MemoryBackendKind};
use taskloom_core::memory::MemoryBackend;
use taskloom_core::provider::Provider;
use taskloom_memory::{Embedder, FileBackend, InMemoryBackend};

/// Build the configured memory store.
pub fn build_memory(config: &AppConfig, provider: Arc<dyn Provider>) -> Arc<dyn MemoryBackend> {
    match config.memory.backend {
        MemoryBackendKind::Memory => Arc::new(InMemoryBackend::new()),
        MemoryBackendKind::File => Arc::new(
            FileBackend::new(config.memory.resolved_path())
                .with_embedder(Embedder::new(provider, &config.models.embeddings)),
        ),
    }
}
