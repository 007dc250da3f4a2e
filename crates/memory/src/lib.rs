//! Memory system implementations for taskloom.

pub mod file_backend;
pub mod in_memory;
pub mod vector;

pub use file_backend::{Embedder, FileBackend};
pub use in_memory::InMemoryBackend;
pub use vector::{
    cosine_similarity, keyword_search, keyword_score, reciprocal_rank_fusion, vector_search,
};
