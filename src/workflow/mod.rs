//! # Workflow Orchestration
//!
//! Drives a multi-step lifecycle operation (install / start / stop / status)
//! for a named component through an explicit state machine, with rollback on
//! failure.
//!
//! ## Core Components
//!
//! - **WorkflowPlan**: Dependency-ordered execution plan; cyclic or unknown
//!   dependencies are fatal at build time, before any step runs
//! - **WorkflowOrchestrator**: Sequential executor with health readiness
//!   gates, bounded retry, reverse-order rollback, and cooperative
//!   cancellation
//! - **WorkflowProgress**: Per-run ledger, exclusively owned and mutated by
//!   the orchestrator; external callers poll cloned snapshots
//! - **EventPublisher**: Broadcast lifecycle events for observers; publishing
//!   requires no subscribers and never fails the run

pub mod events;
pub mod orchestrator;
pub mod plan;
pub mod progress;
pub mod step;

pub use events::{EventPublisher, PublishedEvent, WorkflowEvent};
pub use orchestrator::{CancellationHandle, RunSummary, WorkflowOrchestrator};
pub use plan::{PlanError, WorkflowPlan};
pub use progress::{RunOutcome, RunState, StepRecord, StepState, WorkflowProgress};
pub use step::{LifecycleAction, StepAction, StepContext, WorkflowStep};
