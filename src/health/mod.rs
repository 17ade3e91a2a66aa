//! # Health Check Subsystem
//!
//! Point-in-time, side-effect-free assessment of environment readiness.
//!
//! ## Core Components
//!
//! - **HealthChecker**: Runs the check battery (database connectivity, API
//!   reachability, process liveness, inter-service dependencies, resource
//!   usage) and aggregates a worst-of verdict
//! - **Reporter**: Pure transformation of checker output into an ordered,
//!   deterministic report for the display layer
//! - **Probes**: Boundary traits implemented by the surrounding application
//!   (container runtime adapter, database client, HTTP client)
//!
//! No probe failure ever escapes this module as an error: every failure mode
//! becomes a typed [`HealthCheckResult`], which makes the checker safe to call
//! from the orchestrator's critical path.

pub mod checker;
pub mod probes;
pub mod reporter;
pub mod types;

pub use checker::HealthChecker;
pub use probes::{
    DatabasePing, HttpProbe, HttpProbeResponse, ProcessInspector, ProcessState, ResourceSampler,
};
pub use reporter::{generate_report, render, HealthReport, ReportEntry, StatusCounts};
pub use types::{HealthCheckResult, HealthStatus, ResourceUsage};
