//! Typed failure kinds of the decision loop.
//!
//! None of these ever escape [`crate::EvaluationLoop::evaluate`]: each one is
//! absorbed at the point it occurs and turned into a degraded but still
//! answerable state. They exist so that the degradation is observable.

use taskloom_core::error::{CapabilityError, ProviderError};
use taskloom_core::ActionId;
use thiserror::Error;

/// Why the classifier could not produce a usable intent.
#[derive(Debug, Clone, Error)]
pub enum ClassificationError {
    #[error("classifier unavailable: {0}")]
    Unavailable(#[from] ProviderError),

    #[error("classifier returned an unparseable payload: {0}")]
    MalformedPayload(String),

    #[error("classifier chose an unknown action: {0}")]
    UnknownAction(String),
}

/// Why the planner could not produce a plan.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("planner unavailable: {0}")]
    Unavailable(#[from] ProviderError),

    #[error("planner did not call the plan function")]
    NoPlan,

    #[error("planner returned an unparseable payload: {0}")]
    MalformedPayload(String),
}

/// Why an action produced an error result instead of its output.
#[derive(Debug, Error)]
pub enum ExecutionFailure {
    #[error("could not fill arguments: {0}")]
    Unavailable(#[from] ProviderError),

    #[error("the model did not call {0}")]
    NoCall(ActionId),

    #[error("malformed arguments for {action}: {reason}")]
    MalformedArguments { action: ActionId, reason: String },

    #[error("{action} failed: {source}")]
    Capability {
        action: ActionId,
        #[source]
        source: CapabilityError,
    },

    #[error("{action} timed out after {secs}s")]
    TimedOut { action: ActionId, secs: u64 },

    #[error("planning failed: {0}")]
    Planning(#[from] PlanError),

    #[error("{0} cannot be executed")]
    NotExecutable(ActionId),
}
