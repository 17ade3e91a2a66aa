//! # Workflow Events
//!
//! Broadcast lifecycle events so observers (CLI progress display, log
//! shippers) can follow a run without polling. Publishing requires no
//! subscribers and never fails the run.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::health::HealthStatus;

use super::progress::RunOutcome;

/// Lifecycle events emitted by the orchestrator during a run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    RunStarted {
        run_id: Uuid,
        step_count: usize,
    },
    StepStarted {
        run_id: Uuid,
        step_name: String,
        attempt: u32,
    },
    StepSucceeded {
        run_id: Uuid,
        step_name: String,
    },
    StepFailed {
        run_id: Uuid,
        step_name: String,
        message: String,
    },
    StepSkipped {
        run_id: Uuid,
        step_name: String,
        reason: String,
    },
    HealthGateBlocked {
        run_id: Uuid,
        step_name: String,
        aggregate: HealthStatus,
    },
    RollbackStarted {
        run_id: Uuid,
        reason: String,
    },
    StepRolledBack {
        run_id: Uuid,
        step_name: String,
    },
    CompensationSkipped {
        run_id: Uuid,
        step_name: String,
    },
    RunFinished {
        run_id: Uuid,
        outcome: RunOutcome,
    },
}

impl WorkflowEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::StepStarted { .. } => "step_started",
            Self::StepSucceeded { .. } => "step_succeeded",
            Self::StepFailed { .. } => "step_failed",
            Self::StepSkipped { .. } => "step_skipped",
            Self::HealthGateBlocked { .. } => "health_gate_blocked",
            Self::RollbackStarted { .. } => "rollback_started",
            Self::StepRolledBack { .. } => "step_rolled_back",
            Self::CompensationSkipped { .. } => "compensation_skipped",
            Self::RunFinished { .. } => "run_finished",
        }
    }
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: WorkflowEvent,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Broadcast publisher for workflow lifecycle events.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. A send with no subscribers is acceptable: events are
    /// advisory and must never affect the run's outcome.
    pub fn publish(&self, event: WorkflowEvent) {
        let published = PublishedEvent {
            event,
            published_at: chrono::Utc::now(),
        };
        let _ = self.sender.send(published);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}
