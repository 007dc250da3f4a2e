//! Executor — fill an action's arguments, run it, record the call.
//!
//! Every execution appends exactly two entries: the assistant's call record
//! and the function result. Failures anywhere along the way become an
//! `Error: ...` function result instead of an error return.

use std::time::Instant;

use taskloom_core::capability::{ActionDescriptor, ActionId, ActionRegistry, Handler};
use taskloom_core::transcript::{CallRecord, Entry};
use tracing::{debug, info, warn};

use crate::completion::Completion;
use crate::error::ExecutionFailure;
use crate::planner::{PlanResult, Planner};

const PREAMBLE: &str = "Transcript of AI assistant responding to user requests. Replies with the action to perform, including reasoning, and the confidence interval from 0 to 100.";

/// What an execution produced.
#[derive(Debug)]
pub enum ActionOutput {
    /// Text returned by a capability
    Text(String),
    /// Subtasks returned by the planner
    Plan(PlanResult),
    /// The action could not run; the transcript holds the error text
    Failed(ExecutionFailure),
}

impl ActionOutput {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// The text recorded as the function result.
    fn result_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Plan(plan) => serde_json::to_string(plan).unwrap_or_default(),
            Self::Failed(failure) => format!("Error: {failure}"),
        }
    }
}

/// One executed action.
#[derive(Debug)]
pub struct Execution {
    pub action: ActionId,
    /// The call record followed by the function result
    pub entries: Vec<Entry>,
    pub output: ActionOutput,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Executor {
    completion: Completion,
    planner: Planner,
}

impl Executor {
    pub fn new(completion: Completion, planner: Planner) -> Self {
        Self {
            completion,
            planner,
        }
    }

    /// Run `action` for `instruction`.
    pub async fn execute(
        &self,
        action: ActionId,
        instruction: &str,
        registry: &ActionRegistry,
    ) -> Execution {
        let started = Instant::now();

        let (arguments, output) = match registry.lookup(action) {
            Ok(descriptor) => self.run(descriptor, instruction, registry).await,
            Err(_) => (
                serde_json::json!({}),
                ActionOutput::Failed(ExecutionFailure::NotExecutable(action)),
            ),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match &output {
            ActionOutput::Failed(failure) => {
                warn!(%action, error = %failure, duration_ms, "Action failed")
            }
            _ => info!(%action, duration_ms, "Action executed"),
        }

        let entries = vec![
            Entry::call(CallRecord::new(action, arguments)),
            Entry::function_result(action, output.result_text()),
        ];

        Execution {
            action,
            entries,
            output,
            duration_ms,
        }
    }

    async fn run(
        &self,
        descriptor: &ActionDescriptor,
        instruction: &str,
        registry: &ActionRegistry,
    ) -> (serde_json::Value, ActionOutput) {
        let action = descriptor.id;

        let arguments = if descriptor.signature.is_some() {
            match self.fill_arguments(descriptor, instruction, registry).await {
                Ok(arguments) => arguments,
                Err((raw, failure)) => return (raw, ActionOutput::Failed(failure)),
            }
        } else {
            serde_json::Value::String(instruction.to_string())
        };

        let output = match &descriptor.handler {
            Handler::Terminal => ActionOutput::Failed(ExecutionFailure::NotExecutable(action)),
            Handler::Planner => {
                let description = arguments["description"].as_str().unwrap_or(instruction);
                match self.planner.plan(description, registry).await {
                    Ok(plan) => ActionOutput::Plan(plan),
                    Err(e) => ActionOutput::Failed(e.into()),
                }
            }
            Handler::Capability(capability) => {
                let timeout = self.completion.timeout();
                match tokio::time::timeout(timeout, capability.invoke(arguments.clone())).await {
                    Ok(Ok(text)) => ActionOutput::Text(text),
                    Ok(Err(source)) => {
                        ActionOutput::Failed(ExecutionFailure::Capability { action, source })
                    }
                    Err(_) => ActionOutput::Failed(ExecutionFailure::TimedOut {
                        action,
                        secs: timeout.as_secs(),
                    }),
                }
            }
        };

        (arguments, output)
    }

    /// Ask the provider to fill the action's parameter schema from `instruction`.
    ///
    /// On failure, returns whatever arguments are worth recording alongside
    /// the reason.
    async fn fill_arguments(
        &self,
        descriptor: &ActionDescriptor,
        instruction: &str,
        registry: &ActionRegistry,
    ) -> Result<serde_json::Value, (serde_json::Value, ExecutionFailure)> {
        let action = descriptor.id;
        let empty = serde_json::json!({});

        let messages = vec![
            Entry::user(format!("{PREAMBLE}\n{}\n", descriptor.description)),
            Entry::user(format!("{instruction}\nFunction call: ")),
        ];

        let response = self
            .completion
            .forced(messages, registry.function_schemas(), action.as_str())
            .await
            .map_err(|e| (empty.clone(), ExecutionFailure::from(e)))?;

        let call = response
            .function_call
            .ok_or_else(|| (empty.clone(), ExecutionFailure::NoCall(action)))?;

        if call.name != action.as_str() {
            warn!(expected = %action, got = %call.name, "Provider called a different function, keeping the forced one");
        }
        debug!(%action, arguments = %call.arguments, "Filled arguments");

        let arguments: serde_json::Value = serde_json::from_str(&call.arguments).map_err(|e| {
            (
                serde_json::Value::String(call.arguments.clone()),
                ExecutionFailure::MalformedArguments {
                    action,
                    reason: e.to_string(),
                },
            )
        })?;

        if let Some(schema) = descriptor.parameter_schema() {
            validate(action, schema, &arguments).map_err(|failure| (arguments.clone(), failure))?;
        }

        Ok(arguments)
    }
}

fn validate(
    action: ActionId,
    schema: &serde_json::Value,
    arguments: &serde_json::Value,
) -> Result<(), ExecutionFailure> {
    let validator = jsonschema::validator_for(schema).map_err(|e| {
        ExecutionFailure::MalformedArguments {
            action,
            reason: format!("invalid parameter schema: {e}"),
        }
    })?;

    let violations: Vec<String> = validator
        .iter_errors(arguments)
        .map(|e| e.to_string())
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ExecutionFailure::MalformedArguments {
            action,
            reason: violations.join("; "),
        })
    }
}
