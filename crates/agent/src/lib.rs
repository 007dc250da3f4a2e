//! The decision-and-execution loop — the heart of taskloom.
//!
//! For every user message the loop follows a **Classify → Act → Re-evaluate → Reply** cycle:
//!
//! 1. **Classify** the request into one registered action (or `reply`)
//! 2. **Act**: fill the action's arguments and run it; a `plan` expands into
//!    subtasks that run one after another
//! 3. **Re-evaluate** (optional): ask whether the output calls for another action
//! 4. **Reply**: synthesize a natural-language answer from the transcript
//!
//! Every external call can fail; none of those failures reach the caller.

pub mod classifier;
pub mod completion;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod formatter;
pub mod planner;
pub mod session;

pub use classifier::{Intent, IntentClassifier};
pub use completion::Completion;
pub use error::{ClassificationError, ExecutionFailure, PlanError};
pub use evaluator::{Evaluation, EvaluationLoop, EvaluationOptions, FALLBACK_REPLY};
pub use executor::{ActionOutput, Execution, Executor};
pub use formatter::{Summarizer, render};
pub use planner::{PlanResult, Planner, Subtask};
pub use session::Session;

#[cfg(test)]
pub(crate) mod test_helpers;
