//! Domain event system — decoupled observation of the agent loop.
//!
//! Events are published when the loop makes a decision or takes a degraded
//! path. Other components subscribe to react without tight coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::capability::ActionId;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The classifier picked an action
    IntentClassified {
        action: ActionId,
        confidence: Option<f64>,
        re_evaluation: bool,
        timestamp: DateTime<Utc>,
    },

    /// Classification failed and the loop fell back to replying
    ClassificationDegraded {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The planner produced a plan
    PlanProduced {
        subtasks: usize,
        timestamp: DateTime<Utc>,
    },

    /// An action was executed
    ActionExecuted {
        action: ActionId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Re-evaluation stopped at its round limit
    ReEvaluationCapped {
        rounds: usize,
        timestamp: DateTime<Utc>,
    },

    /// The final reply was appended
    ReplySynthesized {
        model: String,
        degraded: bool,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
