use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome classification for a single health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Check passed within all thresholds
    Healthy,
    /// Operational but below a defined quality threshold
    Degraded,
    /// Check failed or the target is unreachable
    Unhealthy,
    /// The check could not observe the target (unreadable metric, missing data)
    Unknown,
}

impl HealthStatus {
    /// Severity rank used for worst-of aggregation:
    /// `unhealthy > degraded > unknown > healthy`.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Healthy => 0,
            Self::Unknown => 1,
            Self::Degraded => 2,
            Self::Unhealthy => 3,
        }
    }

    /// Worst status in a set. An empty set is vacuously healthy.
    pub fn worst<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses
            .into_iter()
            .max_by_key(HealthStatus::severity)
            .unwrap_or(Self::Healthy)
    }

    /// Check if the target can still serve traffic in this status
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(Self::Healthy),
            "degraded" => Ok(Self::Degraded),
            "unhealthy" => Ok(Self::Unhealthy),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid health status: {s}")),
        }
    }
}

/// One outcome of a single check invocation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub check_name: String,
    pub status: HealthStatus,
    pub message: String,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
    /// Structured payload for the display layer (e.g. a resource snapshot).
    pub details: Option<serde_json::Value>,
}

impl HealthCheckResult {
    pub fn new(
        check_name: impl Into<String>,
        status: HealthStatus,
        message: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            check_name: check_name.into(),
            status,
            message: message.into(),
            latency,
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn healthy(
        check_name: impl Into<String>,
        message: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self::new(check_name, HealthStatus::Healthy, message, latency)
    }

    pub fn degraded(
        check_name: impl Into<String>,
        message: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self::new(check_name, HealthStatus::Degraded, message, latency)
    }

    pub fn unhealthy(
        check_name: impl Into<String>,
        message: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self::new(check_name, HealthStatus::Unhealthy, message, latency)
    }

    pub fn unknown(
        check_name: impl Into<String>,
        message: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self::new(check_name, HealthStatus::Unknown, message, latency)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Snapshot of a resource counter at a point in time.
///
/// `used > capacity` is a valid, reportable overcommit state rather than an
/// enforced invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub resource_name: String,
    pub used: f64,
    pub capacity: Option<f64>,
    pub unit: String,
}

impl ResourceUsage {
    pub fn new(
        resource_name: impl Into<String>,
        used: f64,
        capacity: Option<f64>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            resource_name: resource_name.into(),
            used,
            capacity,
            unit: unit.into(),
        }
    }

    /// Fraction of capacity in use, when capacity is known and positive.
    pub fn utilization(&self) -> Option<f64> {
        match self.capacity {
            Some(capacity) if capacity > 0.0 => Some(self.used / capacity),
            _ => None,
        }
    }

    pub fn is_overcommitted(&self) -> bool {
        matches!(self.capacity, Some(capacity) if self.used > capacity)
    }
}

impl fmt::Display for ResourceUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.capacity {
            Some(capacity) => write!(
                f,
                "{}: {:.1}/{:.1} {}",
                self.resource_name, self.used, capacity, self.unit
            ),
            None => write!(f, "{}: {:.1} {}", self.resource_name, self.used, self.unit),
        }
    }
}
