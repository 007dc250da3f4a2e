//! Planner — decompose a request into ordered subtasks.
//!
//! Subtask actions are constrained to the plannable subset of the registry,
//! so a plan can never contain `plan` or `reply`.

use serde::{Deserialize, Serialize};
use taskloom_core::capability::{ActionId, ActionRegistry, Filter};
use taskloom_core::provider::FunctionSchema;
use taskloom_core::transcript::Entry;
use tracing::{debug, info, warn};

use crate::completion::Completion;
use crate::error::PlanError;

const PLAN_FUNCTION: &str = "plan";

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subtask {
    /// Self-contained instruction for the step
    #[serde(rename = "reasoning")]
    pub instruction: String,

    #[serde(rename = "function")]
    pub action: ActionId,
}

impl Subtask {
    pub fn new(action: ActionId, instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            action,
        }
    }
}

/// An ordered list of subtasks. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanResult {
    pub subtasks: Vec<Subtask>,
}

impl PlanResult {
    pub fn is_empty(&self) -> bool {
        self.subtasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.subtasks.len()
    }
}

#[derive(Deserialize)]
struct PlanPayload {
    subtasks: Vec<SubtaskPayload>,
}

#[derive(Deserialize)]
struct SubtaskPayload {
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    function: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Planner {
    completion: Completion,
}

impl Planner {
    pub fn new(completion: Completion) -> Self {
        Self { completion }
    }

    /// Ask the provider for a plan that fulfils `description`.
    ///
    /// Subtasks naming an action that is unknown, unregistered or not
    /// plannable are dropped with a warning; the rest keep their order.
    pub async fn plan(
        &self,
        description: &str,
        registry: &ActionRegistry,
    ) -> Result<PlanResult, PlanError> {
        info!(%description, "Calculating plan");

        let descriptions: String = registry
            .describe_all(Filter::All)
            .into_iter()
            .map(|d| d + "\n")
            .collect();

        let prompt = format!(
            "Transcript of AI assistant responding to user requests. \n\
             {descriptions}\n\
             Request: {description}\n\n\
             The assistant replies with a plan to answer the request with a list of subtasks with logical steps. \
             The reasoning includes a self-contained, detailed and descriptive instruction to fullfill the task.\n\n\
             Function call: "
        );

        let response = self
            .completion
            .forced(vec![Entry::user(prompt)], vec![plan_schema(registry)], PLAN_FUNCTION)
            .await?;

        let call = response.function_call.ok_or(PlanError::NoPlan)?;
        debug!(arguments = %call.arguments, "Planner payload");

        let payload: PlanPayload = serde_json::from_str(&call.arguments)
            .map_err(|e| PlanError::MalformedPayload(e.to_string()))?;

        let plannable = registry.ids(Filter::Plannable);
        let subtasks: Vec<Subtask> = payload
            .subtasks
            .into_iter()
            .filter_map(|raw| {
                let name = raw.function.unwrap_or_default();
                let action = match name.parse::<ActionId>() {
                    Ok(action) if plannable.contains(&action) => action,
                    _ => {
                        warn!(function = %name, "Skipping subtask with a non-plannable action");
                        return None;
                    }
                };
                let instruction = raw.reasoning.unwrap_or_default();
                if instruction.trim().is_empty() {
                    warn!(%action, "Skipping subtask without an instruction");
                    return None;
                }
                Some(Subtask::new(action, instruction))
            })
            .collect();

        info!(subtasks = subtasks.len(), "Plan calculated");
        Ok(PlanResult { subtasks })
    }
}

/// The forced `plan` function, with subtask actions constrained to plannable ids.
pub fn plan_schema(registry: &ActionRegistry) -> FunctionSchema {
    let plannable: Vec<&str> = registry
        .ids(Filter::Plannable)
        .into_iter()
        .map(|id| id.as_str())
        .collect();

    FunctionSchema {
        name: PLAN_FUNCTION.into(),
        description: "Decide to do an action.".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "subtasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "reasoning": {
                                "type": "string",
                                "description": "subtask list"
                            },
                            "function": {
                                "type": "string",
                                "enum": plannable
                            }
                        }
                    }
                }
            },
            "required": ["subtasks"]
        }),
    }
}
