//! Transcript rendering and compression.
//!
//! [`render`] folds entries into the plain-text block that is fed back into
//! classification and subtask prompts. [`Summarizer`] optionally compresses
//! such blocks to keep prompts from growing without bound.

use taskloom_core::transcript::Entry;
use tracing::{debug, warn};

use crate::completion::Completion;

/// Render entries as prompt text, one line per entry, in order.
///
/// System entries and entries without content are skipped. Call lines are the
/// call record's JSON, with filled arguments inlined as an object; arguments
/// that never parsed stay a JSON string.
pub fn render(entries: &[Entry]) -> String {
    let mut out = String::new();
    for entry in entries {
        match entry {
            Entry::Function { content, .. } if !content.is_empty() => {
                out.push_str("Function result: ");
                out.push_str(content);
                out.push('\n');
            }
            Entry::Assistant {
                function_call: Some(call),
                ..
            } => {
                out.push_str(&serde_json::to_string(call).unwrap_or_default());
                out.push('\n');
            }
            Entry::User { content } if !content.is_empty() => {
                out.push_str(content);
                out.push('\n');
            }
            Entry::Assistant {
                content: Some(content),
                function_call: None,
            } if !content.is_empty() => {
                out.push_str("Assistant message: ");
                out.push_str(content);
                out.push('\n');
            }
            _ => {}
        }
    }
    out
}

const SUMMARIZE_PROMPT: &str = "Summarize the following text, keeping the relevant information:";

/// Compresses text through the LLM model.
#[derive(Debug, Clone)]
pub struct Summarizer {
    completion: Completion,
}

impl Summarizer {
    pub fn new(completion: Completion) -> Self {
        Self { completion }
    }

    /// Summarize `text`. On any failure the input is returned unchanged.
    pub async fn summarize(&self, text: &str) -> String {
        let prompt = format!("{SUMMARIZE_PROMPT}\n\n```\n{text}\n```\n");
        debug!(chars = text.len(), "Post processing");

        match self.completion.text(vec![Entry::user(prompt)]).await {
            Ok(response) => match response.content.filter(|c| !c.trim().is_empty()) {
                Some(summary) => {
                    debug!(before = text.len(), after = summary.len(), "Post processed");
                    summary
                }
                None => {
                    warn!("Summarizer returned no content, keeping original text");
                    text.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "Summarizer failed, keeping original text");
                text.to_string()
            }
        }
    }

    /// Summarize when a summarizer is configured, otherwise pass through.
    pub async fn maybe(summarizer: Option<&Self>, text: String) -> String {
        match summarizer {
            Some(s) => s.summarize(&text).await,
            None => text,
        }
    }
}
