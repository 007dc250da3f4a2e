//! Intent classification — which action should handle the input.
//!
//! The provider is forced to call a single `intent` function whose `action`
//! parameter is an enum over the registry's action ids, so a well-behaved
//! provider can only answer with a registered action.

use serde::Deserialize;
use taskloom_core::capability::{ActionId, ActionRegistry, Filter};
use taskloom_core::provider::FunctionSchema;
use taskloom_core::transcript::Entry;
use tracing::{debug, info};

use crate::completion::Completion;
use crate::error::ClassificationError;

const INTENT_FUNCTION: &str = "intent";

const PREAMBLE: &str = "Transcript of AI assistant responding to user requests. Replies with the action to perform and the reasoning.";

/// The classifier's decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: ActionId,
    pub reasoning: String,
    /// Advisory only, never used for gating
    pub confidence: Option<f64>,
    pub observation: Option<String>,
}

impl Intent {
    /// The terminal choice.
    pub fn reply() -> Self {
        Self {
            action: ActionId::Reply,
            reasoning: String::new(),
            confidence: None,
            observation: None,
        }
    }
}

#[derive(Deserialize)]
struct IntentPayload {
    action: String,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    observation: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IntentClassifier {
    completion: Completion,
}

impl IntentClassifier {
    pub fn new(completion: Completion) -> Self {
        Self { completion }
    }

    /// Pick an action for `context`.
    ///
    /// A response without a function call means the model chose not to act
    /// and yields [`Intent::reply`]. Every other failure is returned so the
    /// caller can decide how to degrade.
    pub async fn classify(
        &self,
        context: &str,
        registry: &ActionRegistry,
    ) -> Result<Intent, ClassificationError> {
        let descriptions: String = registry
            .describe_all(Filter::All)
            .into_iter()
            .map(|d| d + "\n")
            .collect();

        let messages = vec![
            Entry::user(format!("{PREAMBLE}\n{descriptions}")),
            Entry::user(format!("{context}\nFunction call: ")),
        ];

        let response = self
            .completion
            .forced(messages, vec![intent_schema(registry)], INTENT_FUNCTION)
            .await?;

        let Some(call) = response.function_call else {
            debug!("Classifier answered without a function call, replying");
            return Ok(Intent::reply());
        };

        debug!(function = %call.name, arguments = %call.arguments, "Classifier payload");

        let payload: IntentPayload = serde_json::from_str(&call.arguments)
            .map_err(|e| ClassificationError::MalformedPayload(e.to_string()))?;

        let descriptor = registry
            .lookup_name(&payload.action)
            .map_err(|_| ClassificationError::UnknownAction(payload.action.clone()))?;

        let intent = Intent {
            action: descriptor.id,
            reasoning: payload.reasoning.unwrap_or_default(),
            confidence: payload.confidence,
            observation: payload.observation.filter(|o| !o.is_empty()),
        };

        info!(
            action = %intent.action,
            confidence = ?intent.confidence,
            reasoning = %intent.reasoning,
            "Intent classified"
        );
        Ok(intent)
    }
}

/// The forced `intent` function, with `action` constrained to the registry.
pub fn intent_schema(registry: &ActionRegistry) -> FunctionSchema {
    let actions: Vec<&str> = registry
        .ids(Filter::All)
        .into_iter()
        .map(|id| id.as_str())
        .collect();

    FunctionSchema {
        name: INTENT_FUNCTION.into(),
        description: "Decide to do an action.".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "confidence": {
                    "type": "number",
                    "description": "confidence of the action"
                },
                "reasoning": {
                    "type": "string",
                    "description": "reasoning behind the intent"
                },
                "observation": {
                    "type": "string",
                    "description": "observation about the request"
                },
                "action": {
                    "type": "string",
                    "enum": actions,
                    "description": "user intent"
                }
            },
            "required": ["action"]
        }),
    }
}
