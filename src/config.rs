use crate::error::{EnvflowError, Result};
use crate::resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Core tunables for health checking and workflow orchestration.
///
/// Treated as an immutable snapshot for the duration of a run. Every timeout
/// and threshold lives here so that probes and step actions never carry
/// hardcoded limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvflowConfig {
    /// Upper bound for a single health probe invocation (milliseconds).
    pub check_timeout_ms: u64,
    /// Upper bound for a single workflow step action or compensator (milliseconds).
    pub step_timeout_ms: u64,
    /// Successful API probes slower than this are reported as degraded (milliseconds).
    pub api_latency_degraded_ms: u64,
    /// Resource utilization at or above this fraction is reported as degraded.
    pub resource_degraded_utilization: f64,
    /// Capacity of the workflow event broadcast channel.
    pub event_channel_capacity: usize,
    /// Retry policy shared by external-service checks and retryable steps.
    pub retry: RetryPolicy,
    pub custom_settings: HashMap<String, String>,
}

impl Default for EnvflowConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: 2000,
            step_timeout_ms: 30_000,
            api_latency_degraded_ms: 1000,
            resource_degraded_utilization: 0.90,
            event_channel_capacity: 1000,
            retry: RetryPolicy::default(),
            custom_settings: HashMap::new(),
        }
    }
}

impl EnvflowConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset. Invalid values are configuration errors,
    /// never silent fallbacks.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("ENVFLOW_CHECK_TIMEOUT_MS") {
            config.check_timeout_ms = value.parse().map_err(|e| {
                EnvflowError::Configuration(format!("Invalid check_timeout_ms: {e}"))
            })?;
        }

        if let Ok(value) = std::env::var("ENVFLOW_STEP_TIMEOUT_MS") {
            config.step_timeout_ms = value.parse().map_err(|e| {
                EnvflowError::Configuration(format!("Invalid step_timeout_ms: {e}"))
            })?;
        }

        if let Ok(value) = std::env::var("ENVFLOW_API_LATENCY_DEGRADED_MS") {
            config.api_latency_degraded_ms = value.parse().map_err(|e| {
                EnvflowError::Configuration(format!("Invalid api_latency_degraded_ms: {e}"))
            })?;
        }

        if let Ok(value) = std::env::var("ENVFLOW_RETRY_LIMIT") {
            config.retry.max_attempts = value
                .parse()
                .map_err(|e| EnvflowError::Configuration(format!("Invalid retry_limit: {e}")))?;
        }

        if let Ok(value) = std::env::var("ENVFLOW_BACKOFF_BASE_MS") {
            config.retry.base_delay_ms = value.parse().map_err(|e| {
                EnvflowError::Configuration(format!("Invalid backoff_base_ms: {e}"))
            })?;
        }

        if let Ok(value) = std::env::var("ENVFLOW_BACKOFF_MAX_MS") {
            config.retry.max_delay_ms = value
                .parse()
                .map_err(|e| EnvflowError::Configuration(format!("Invalid backoff_max_ms: {e}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that cannot be expressed in the type system.
    pub fn validate(&self) -> Result<()> {
        if self.check_timeout_ms == 0 {
            return Err(EnvflowError::Configuration(
                "check_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.step_timeout_ms == 0 {
            return Err(EnvflowError::Configuration(
                "step_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.resource_degraded_utilization)
            || self.resource_degraded_utilization == 0.0
        {
            return Err(EnvflowError::Configuration(format!(
                "resource_degraded_utilization must be in (0.0, 1.0], got {}",
                self.resource_degraded_utilization
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(EnvflowError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn api_latency_degraded(&self) -> Duration {
        Duration::from_millis(self.api_latency_degraded_ms)
    }
}

/// Named API endpoint the health checker probes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub name: String,
    pub url: String,
}

/// A component and the process/container identifier used to inspect it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessTarget {
    pub component: String,
    pub identifier: String,
}

/// Static description of the managed environment: what exists and what
/// depends on what. Supplied by the configuration loader at construction
/// time and never mutated during a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    /// Connection target for the database connectivity check, if any.
    pub database_target: Option<String>,
    /// API endpoints probed during comprehensive checks.
    pub api_endpoints: Vec<ApiEndpoint>,
    /// Components with inspectable processes, in declaration order.
    pub processes: Vec<ProcessTarget>,
    /// Resources sampled during comprehensive checks (cpu, memory, disk, ...).
    pub resource_targets: Vec<String>,
    /// Component name -> components it depends on, in declaration order.
    pub dependencies: HashMap<String, Vec<String>>,
}

impl Topology {
    /// Reject topologies that reference undeclared components or declare the
    /// same name twice. Called before any check can run, so a bad topology
    /// can never produce partial side effects.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for process in &self.processes {
            if !seen.insert(process.component.as_str()) {
                return Err(EnvflowError::Configuration(format!(
                    "duplicate process component: {}",
                    process.component
                )));
            }
        }

        let mut endpoint_names = std::collections::HashSet::new();
        for endpoint in &self.api_endpoints {
            if !endpoint_names.insert(endpoint.name.as_str()) {
                return Err(EnvflowError::Configuration(format!(
                    "duplicate api endpoint: {}",
                    endpoint.name
                )));
            }
        }

        for (component, deps) in &self.dependencies {
            if !seen.contains(component.as_str()) {
                return Err(EnvflowError::Configuration(format!(
                    "dependency graph references undeclared component: {component}"
                )));
            }
            for dep in deps {
                if !seen.contains(dep.as_str()) {
                    return Err(EnvflowError::Configuration(format!(
                        "component {component} depends on undeclared component: {dep}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Process identifier for a component, if it declares one.
    pub fn process_identifier(&self, component: &str) -> Option<&str> {
        self.processes
            .iter()
            .find(|p| p.component == component)
            .map(|p| p.identifier.as_str())
    }

    /// Declared dependencies of a component, in declaration order.
    pub fn dependencies_of(&self, component: &str) -> &[String] {
        self.dependencies
            .get(component)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
