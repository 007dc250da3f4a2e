//! # taskloom core
//!
//! Domain types, traits, and error definitions for the taskloom agent loop.
//! This crate has **no I/O** — it defines the domain model that all other
//! crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the loop (completion provider, capability, memory
//! store) is a trait here. Implementations live in their respective crates,
//! so tests can swap in scripted providers and in-memory stores.

pub mod capability;
pub mod error;
pub mod event;
pub mod memory;
pub mod provider;
pub mod transcript;

// Re-export key types at crate root for ergonomics
pub use capability::{ActionDescriptor, ActionId, ActionRegistry, Capability, Filter, Handler};
pub use error::{ActionError, CapabilityError, Error, MemoryError, ProviderError, Result};
pub use event::{DomainEvent, EventBus};
pub use memory::{MemoryBackend, MemoryEntry, MemoryQuery};
pub use provider::{
    EmbeddingRequest, EmbeddingResponse, FunctionCall, FunctionChoice, FunctionSchema, Provider,
    ProviderRequest, ProviderResponse, Usage,
};
pub use transcript::{CallRecord, Entry, Role, Transcript};
