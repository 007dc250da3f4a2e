//! Capability trait and the action registry.
//!
//! Capabilities are what give the agent the ability to act in the world:
//! search the internet, write files, save and recall memories, fetch pages.
//! Each one is registered under a closed [`ActionId`] together with the text
//! that describes it to the model.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ActionError, CapabilityError};
use crate::provider::FunctionSchema;

/// Every action the agent knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
    Reply,
    Plan,
    SearchInternet,
    WriteFile,
    SaveMemory,
    SearchMemory,
    Browser,
}

impl ActionId {
    pub const ALL: [ActionId; 7] = [
        ActionId::Reply,
        ActionId::Plan,
        ActionId::SearchInternet,
        ActionId::WriteFile,
        ActionId::SaveMemory,
        ActionId::SearchMemory,
        ActionId::Browser,
    ];

    /// The wire name used in prompts and function calls.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::Plan => "plan",
            Self::SearchInternet => "search_internet",
            Self::WriteFile => "write_file",
            Self::SaveMemory => "save_memory",
            Self::SearchMemory => "search_memory",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionId {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| ActionError::UnknownAction(s.to_string()))
    }
}

/// The core Capability trait.
///
/// A capability receives the filled arguments (a JSON object for actions with
/// a parameter schema, a JSON string otherwise) and returns the text that is
/// recorded as the function result.
#[async_trait]
pub trait Capability: Send + Sync {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<String, CapabilityError>;
}

/// What runs when an action is chosen.
#[derive(Clone)]
pub enum Handler {
    /// Answer the user; nothing is executed.
    Terminal,
    /// Decompose the request into subtasks.
    Planner,
    /// Invoke an external capability.
    Capability(Arc<dyn Capability>),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal => f.write_str("Terminal"),
            Self::Planner => f.write_str("Planner"),
            Self::Capability(_) => f.write_str("Capability(..)"),
        }
    }
}

/// A registry entry.
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    pub id: ActionId,

    /// Sentence shown to the model when it picks an action
    pub description: String,

    /// Whether the action may appear inside a plan
    pub plannable: bool,

    /// Function signature the provider fills arguments against
    pub signature: Option<FunctionSchema>,

    pub handler: Handler,
}

impl ActionDescriptor {
    /// The terminal `reply` action.
    pub fn reply() -> Self {
        Self {
            id: ActionId::Reply,
            description: format!(
                "For replying to the user, the assistant replies with the action \"{}\" and the reply to the user directly when there is nothing to do.",
                ActionId::Reply
            ),
            plannable: false,
            signature: None,
            handler: Handler::Terminal,
        }
    }

    /// The `plan` action, served by the planner.
    pub fn plan() -> Self {
        Self {
            id: ActionId::Plan,
            description: format!(
                "The assistant for solving complex tasks that involves calling more functions in sequence, replies with the action \"{}\".",
                ActionId::Plan
            ),
            plannable: false,
            signature: Some(FunctionSchema {
                name: ActionId::Plan.to_string(),
                description: "Plan complex tasks.".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "description": {
                            "type": "string",
                            "description": "reasoning behind the planning"
                        }
                    },
                    "required": ["description"]
                }),
            }),
            handler: Handler::Planner,
        }
    }

    /// A plannable action backed by a capability.
    pub fn capability(
        id: ActionId,
        description: impl Into<String>,
        signature: Option<FunctionSchema>,
        capability: Arc<dyn Capability>,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            plannable: true,
            signature,
            handler: Handler::Capability(capability),
        }
    }

    /// Mark the action as unavailable to plans.
    pub fn not_plannable(mut self) -> Self {
        self.plannable = false;
        self
    }

    pub fn parameter_schema(&self) -> Option<&serde_json::Value> {
        self.signature.as_ref().map(|s| &s.parameters)
    }
}

/// Which descriptors an enumeration covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    All,
    Plannable,
}

/// The immutable table of actions available to one agent.
///
/// Order is registration order and is kept stable, since it is rendered
/// verbatim into prompts. `reply` is always present.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    actions: Vec<ActionDescriptor>,
}

impl ActionRegistry {
    /// Build a registry. Later duplicates of an id are ignored; `reply` is
    /// appended when missing.
    pub fn new(descriptors: impl IntoIterator<Item = ActionDescriptor>) -> Self {
        let mut actions: Vec<ActionDescriptor> = Vec::new();
        for descriptor in descriptors {
            if actions.iter().any(|a| a.id == descriptor.id) {
                tracing::warn!(action = %descriptor.id, "Duplicate action registration ignored");
                continue;
            }
            actions.push(descriptor);
        }
        if !actions.iter().any(|a| a.id == ActionId::Reply) {
            actions.push(ActionDescriptor::reply());
        }
        Self { actions }
    }

    /// A registry that can only reply.
    pub fn reply_only() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn lookup(&self, id: ActionId) -> Result<&ActionDescriptor, ActionError> {
        self.actions
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ActionError::NotRegistered(id.to_string()))
    }

    /// Look up by wire name. Names outside the closed set are `UnknownAction`.
    pub fn lookup_name(&self, name: &str) -> Result<&ActionDescriptor, ActionError> {
        let id: ActionId = name.parse()?;
        self.lookup(id)
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.actions.iter().any(|a| a.id == id)
    }

    fn filtered(&self, filter: Filter) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions.iter().filter(move |a| match filter {
            Filter::All => true,
            Filter::Plannable => a.plannable && matches!(a.handler, Handler::Capability(_)),
        })
    }

    /// Description strings in registration order.
    pub fn describe_all(&self, filter: Filter) -> Vec<String> {
        self.filtered(filter).map(|a| a.description.clone()).collect()
    }

    pub fn ids(&self, filter: Filter) -> Vec<ActionId> {
        self.filtered(filter).map(|a| a.id).collect()
    }

    /// Signatures of every action that declares one, in registration order.
    pub fn function_schemas(&self) -> Vec<FunctionSchema> {
        self.actions
            .iter()
            .filter_map(|a| a.signature.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
