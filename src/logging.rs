//! # Structured Logging Module
//!
//! Environment-aware structured logging for health checks and workflow runs.
//! Output format is plain text by default and JSON when `ENVFLOW_LOG_FORMAT=json`
//! is set, so the same binary serves interactive CLI use and log aggregation.

use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level.clone()));

        let json_output = std::env::var("ENVFLOW_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let init_result = if json_output {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(filter),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(true)
                        .with_filter(filter),
                )
                .try_init()
        };

        // A subscriber may already be installed by the embedding application.
        if init_result.is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            environment = %environment,
            log_level = %log_level,
            json = json_output,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("ENVFLOW_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for health check operations
pub fn log_check_operation(
    check_name: &str,
    status: &str,
    latency_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        check_name = %check_name,
        status = %status,
        latency_ms = latency_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🩺 HEALTH_CHECK"
    );
}

/// Log structured data for workflow operations
pub fn log_workflow_operation(
    operation: &str,
    run_id: Option<Uuid>,
    step_name: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    let run_id = run_id.map(|id| id.to_string());
    tracing::info!(
        operation = %operation,
        run_id = run_id.as_deref(),
        step_name = step_name,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔧 WORKFLOW_OPERATION"
    );
}
