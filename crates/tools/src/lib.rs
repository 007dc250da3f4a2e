//! Built-in capabilities for taskloom.
//!
//! Capabilities give the agent the ability to act in the world:
//! search the internet, fetch pages, write files, and save or recall memories.

pub mod browser;
pub mod file_write;
pub mod memory_save;
pub mod memory_search;
pub mod web_search;

use std::sync::Arc;

use taskloom_config::AppConfig;
use taskloom_core::capability::{ActionDescriptor, ActionId, ActionRegistry};
use taskloom_core::memory::MemoryBackend;
use taskloom_core::provider::FunctionSchema;

pub use browser::Browser;
pub use file_write::WriteFile;
pub use memory_save::SaveMemory;
pub use memory_search::SearchMemory;
pub use web_search::SearchInternet;

fn signature(id: ActionId, description: &str, parameters: serde_json::Value) -> Option<FunctionSchema> {
    Some(FunctionSchema {
        name: id.to_string(),
        description: description.into(),
        parameters,
    })
}

/// Create the default registry with every built-in capability, `plan` and `reply`.
///
/// Registration order is the order actions are presented to the model.
pub fn default_registry(config: &AppConfig, memory: Arc<dyn MemoryBackend>) -> ActionRegistry {
    let tools = &config.tools;

    let search_internet = ActionDescriptor::capability(
        ActionId::SearchInternet,
        format!(
            "For searching the internet with a query, the assistant replies with the action \"{}\" and the query to search.",
            ActionId::SearchInternet
        ),
        signature(
            ActionId::SearchInternet,
            "For searching internet.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "the query to search for" }
                },
                "required": ["query"]
            }),
        ),
        Arc::new(SearchInternet::new(tools.search_results)),
    );

    let write_file = ActionDescriptor::capability(
        ActionId::WriteFile,
        format!(
            "The assistant replies with the action \"{}\", the filename and content to save for writing a file to disk permanently. This can be used to store the result of complex actions locally.",
            ActionId::WriteFile
        ),
        signature(
            ActionId::WriteFile,
            "For saving a file to disk with content.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "filename": { "type": "string", "description": "name of the file to write" },
                    "content": { "type": "string", "description": "content to save" }
                },
                "required": ["filename", "content"]
            }),
        ),
        Arc::new(WriteFile::new(tools.persistent_dir.clone())),
    );

    let save_memory = ActionDescriptor::capability(
        ActionId::SaveMemory,
        format!(
            "The assistant replies with the action \"{}\" and the string to remember or store an information that thinks it is relevant permanently.",
            ActionId::SaveMemory
        ),
        signature(
            ActionId::SaveMemory,
            "Save or store informations into memory.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "thought": { "type": "string", "description": "information to save" }
                },
                "required": ["thought"]
            }),
        ),
        Arc::new(SaveMemory::new(memory.clone())),
    );

    let browser = ActionDescriptor::capability(
        ActionId::Browser,
        format!(
            "The assistant replies with the action \"{}\" to navigate links.",
            ActionId::Browser
        ),
        signature(
            ActionId::Browser,
            "Navigate to a URL and read its content.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "the URL to open" },
                    "reasoning": { "type": "string", "description": "reasoning behind the intent" }
                },
                "required": ["url"]
            }),
        ),
        Arc::new(Browser::new(tools.browse_max_chars)),
    );

    let search_memory = ActionDescriptor::capability(
        ActionId::SearchMemory,
        format!(
            "The assistant replies with the action \"{}\" for searching between its memories with a query term.",
            ActionId::SearchMemory
        ),
        signature(
            ActionId::SearchMemory,
            "Search in memory",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "reasoning": { "type": "string", "description": "reasoning behind the intent" }
                },
                "required": ["reasoning"]
            }),
        ),
        Arc::new(SearchMemory::new(memory, config.memory.recall_limit)),
    );

    ActionRegistry::new([
        search_internet,
        write_file,
        save_memory,
        browser,
        search_memory,
        ActionDescriptor::plan(),
        ActionDescriptor::reply(),
    ])
}
