#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Envflow Core
//!
//! Environment health checking and workflow orchestration core for managing
//! Docker-based "agent" and "main" application environments.
//!
//! ## Overview
//!
//! Two collaborating subsystems: a [`health::HealthChecker`] produces
//! point-in-time, side-effect-free readiness assessments, and a
//! [`workflow::WorkflowOrchestrator`] drives multi-step lifecycle operations
//! (install / start / stop / status) through an explicit state machine,
//! consulting the checker as a readiness oracle and rolling back completed
//! steps when a step fails.
//!
//! The surrounding application (CLI wiring, Docker Compose generation,
//! display) stays outside this crate and plugs in through boundary traits:
//! probes for the health checker and [`workflow::StepAction`] handlers for
//! the orchestrator.
//!
//! ## Module Organization
//!
//! - [`health`] - Check battery, worst-of aggregation, pure reporting
//! - [`workflow`] - Plan building, sequential execution, rollback, events
//! - [`resilience`] - Bounded exponential backoff shared by both subsystems
//! - [`config`] - Immutable configuration and topology snapshots
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured tracing initialization
//!
//! ## Failure Semantics
//!
//! No health probe failure ever escapes as an error: every failure mode
//! (timeout, connection refused, missing process) becomes a typed
//! [`health::HealthCheckResult`]. The orchestrator propagates only a final
//! [`workflow::RunSummary`]; per-step detail lives in the
//! [`workflow::WorkflowProgress`] ledger.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use envflow_core::config::{EnvflowConfig, Topology};
//! use envflow_core::workflow::{LifecycleAction, WorkflowPlan, WorkflowStep};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EnvflowConfig::from_env()?;
//!
//! let plan = WorkflowPlan::build(vec![
//!     WorkflowStep::new("install_main", "main", LifecycleAction::Install),
//!     WorkflowStep::new("start_main", "main", LifecycleAction::Start)
//!         .depends_on("install_main"),
//!     WorkflowStep::new("start_agent", "agent", LifecycleAction::Start)
//!         .depends_on("start_main")
//!         .health_gated(),
//! ])?;
//!
//! println!("plan has {} steps", plan.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod resilience;
pub mod workflow;

pub use config::{ApiEndpoint, EnvflowConfig, ProcessTarget, Topology};
pub use error::{EnvflowError, Result};
pub use health::{
    generate_report, render, HealthCheckResult, HealthChecker, HealthReport, HealthStatus,
    ResourceUsage,
};
pub use resilience::{retry_with_backoff, BackoffCalculator, RetryPolicy};
pub use workflow::{
    CancellationHandle, EventPublisher, LifecycleAction, PlanError, RunOutcome, RunState,
    RunSummary, StepAction, StepContext, StepRecord, StepState, WorkflowEvent, WorkflowOrchestrator,
    WorkflowPlan, WorkflowProgress, WorkflowStep,
};
