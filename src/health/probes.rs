//! # Probe Boundary Traits
//!
//! Contracts implemented by the surrounding application (container runtime
//! adapter, database client, HTTP client, metrics reader). The checker calls
//! these behind its own timeout and converts every error into a typed result,
//! so implementations are free to return whatever `anyhow::Error` fits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::ResourceUsage;

/// Observed state of an expected process or container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessState {
    /// Process is up and stable
    Running,
    /// Process is up but cycling through restarts
    RestartLooping { restarts: u32 },
    /// Process exists but is not running
    Stopped,
    /// No process with the given identifier exists
    NotFound,
}

/// Response from a bounded HTTP probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProbeResponse {
    pub status_code: u16,
    pub latency: Duration,
}

impl HttpProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Lightweight database connectivity probe. Returns round-trip latency.
#[async_trait]
pub trait DatabasePing: Send + Sync {
    async fn ping(&self, target: &str) -> anyhow::Result<Duration>;
}

/// Bounded-time HTTP endpoint probe.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn probe(&self, url: &str) -> anyhow::Result<HttpProbeResponse>;
}

/// Process/container inspection, the boundary to the container runtime.
#[async_trait]
pub trait ProcessInspector: Send + Sync {
    async fn inspect(&self, identifier: &str) -> anyhow::Result<ProcessState>;
}

/// Resource counter sampling (cpu, memory, disk, connection pools).
///
/// Implementations must acquire and release anything they touch within one
/// call; the checker holds nothing between invocations.
#[async_trait]
pub trait ResourceSampler: Send + Sync {
    async fn sample(&self, target: &str) -> anyhow::Result<ResourceUsage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_success_range() {
        let ok = HttpProbeResponse {
            status_code: 204,
            latency: Duration::from_millis(3),
        };
        assert!(ok.is_success());

        let redirect = HttpProbeResponse {
            status_code: 301,
            latency: Duration::from_millis(3),
        };
        assert!(!redirect.is_success());

        let server_error = HttpProbeResponse {
            status_code: 503,
            latency: Duration::from_millis(3),
        };
        assert!(!server_error.is_success());
    }

    #[test]
    fn test_process_state_serde() {
        let state = ProcessState::RestartLooping { restarts: 4 };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "{\"state\":\"restart_looping\",\"restarts\":4}");
    }
}
