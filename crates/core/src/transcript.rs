//! Transcript domain types.
//!
//! The transcript is the literal prompt context for every completion the agent
//! makes: user input, assistant function calls, function results, system
//! framing and assistant replies, in the order they happened.

use serde::{Deserialize, Serialize};

use crate::capability::ActionId;

/// The role of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
    /// A capability result
    Function,
}

/// A call to an action, as chosen by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// The action being invoked
    #[serde(rename = "name")]
    pub action: ActionId,

    /// Filled arguments (an object for schema-backed actions, a string for free-text ones)
    pub arguments: serde_json::Value,
}

impl CallRecord {
    pub fn new(action: ActionId, arguments: serde_json::Value) -> Self {
        Self { action, arguments }
    }
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Entry {
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function_call: Option<CallRecord>,
    },
    Function {
        name: ActionId,
        content: String,
    },
    System {
        content: String,
    },
}

impl Entry {
    /// Create a user entry.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create an assistant reply.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            function_call: None,
        }
    }

    /// Create an assistant entry that records a function call.
    pub fn call(record: CallRecord) -> Self {
        Self::Assistant {
            content: None,
            function_call: Some(record),
        }
    }

    /// Create a function result entry.
    pub fn function_result(name: ActionId, content: impl Into<String>) -> Self {
        Self::Function {
            name,
            content: content.into(),
        }
    }

    /// Create a system entry.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Function { .. } => Role::Function,
            Self::System { .. } => Role::System,
        }
    }

    /// The text content, if the entry has any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::User { content } | Self::Function { content, .. } | Self::System { content } => {
                Some(content)
            }
            Self::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// The call record carried by an assistant entry.
    pub fn function_call(&self) -> Option<&CallRecord> {
        match self {
            Self::Assistant { function_call, .. } => function_call.as_ref(),
            _ => None,
        }
    }
}

/// An append-only, ordered sequence of entries.
///
/// There is no way to remove or replace an entry once pushed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Append several entries in order.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = Entry>) {
        self.entries.extend(entries);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries appended at or after `start`. Out-of-range starts yield an empty slice.
    pub fn since(&self, start: usize) -> &[Entry] {
        self.entries.get(start..).unwrap_or(&[])
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
