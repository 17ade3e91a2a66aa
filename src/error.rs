use thiserror::Error;

use crate::workflow::plan::PlanError;

/// Top-level error taxonomy for the environment orchestration core.
///
/// Transient infrastructure failures (timeouts, refused connections) never
/// surface here: the health checker converts them into typed
/// [`HealthCheckResult`](crate::health::HealthCheckResult) values, and the
/// orchestrator captures step failures in the progress ledger. Only
/// construction-time problems are raised as errors.
#[derive(Debug, Error)]
pub enum EnvflowError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Planning error: {0}")]
    Planning(#[from] PlanError),

    #[error("Orchestration error: {0}")]
    Orchestration(String),
}

pub type Result<T> = std::result::Result<T, EnvflowError>;
