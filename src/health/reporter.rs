//! # Health Reporter
//!
//! Pure transformation of checker output into a human-presentable report.
//! Holds no state and performs no I/O; identical input always yields
//! byte-identical output, which the display layer's tests rely on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{HealthCheckResult, HealthStatus};

/// Per-status tallies for a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub unhealthy: usize,
    pub degraded: usize,
    pub unknown: usize,
    pub healthy: usize,
}

/// One line of the report, stripped to what the display layer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub check_name: String,
    pub status: HealthStatus,
    pub message: String,
    pub latency_ms: u64,
}

/// Aggregated view over one check battery. Entries are ordered most
/// actionable first: unhealthy, then degraded, then unknown, then healthy,
/// name-sorted within each group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall: HealthStatus,
    pub counts: StatusCounts,
    pub entries: Vec<ReportEntry>,
}

/// Group results by status and compute the overall verdict.
pub fn generate_report(results: &BTreeMap<String, HealthCheckResult>) -> HealthReport {
    let overall = HealthStatus::worst(results.values().map(|r| r.status));

    let mut counts = StatusCounts::default();
    for result in results.values() {
        match result.status {
            HealthStatus::Unhealthy => counts.unhealthy += 1,
            HealthStatus::Degraded => counts.degraded += 1,
            HealthStatus::Unknown => counts.unknown += 1,
            HealthStatus::Healthy => counts.healthy += 1,
        }
    }

    // The input map is already name-ordered, so collecting per status group
    // preserves a stable name sort within each group.
    let mut entries = Vec::with_capacity(results.len());
    for status in [
        HealthStatus::Unhealthy,
        HealthStatus::Degraded,
        HealthStatus::Unknown,
        HealthStatus::Healthy,
    ] {
        for result in results.values().filter(|r| r.status == status) {
            entries.push(ReportEntry {
                check_name: result.check_name.clone(),
                status,
                message: result.message.clone(),
                latency_ms: result.latency.as_millis() as u64,
            });
        }
    }

    HealthReport {
        overall,
        counts,
        entries,
    }
}

/// Deterministic plain-text rendering of a report.
pub fn render(report: &HealthReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "overall: {} ({} unhealthy, {} degraded, {} unknown, {} healthy)\n",
        report.overall,
        report.counts.unhealthy,
        report.counts.degraded,
        report.counts.unknown,
        report.counts.healthy
    ));
    for entry in &report.entries {
        output.push_str(&format!(
            "  [{}] {}: {} ({}ms)\n",
            entry.status, entry.check_name, entry.message, entry.latency_ms
        ));
    }
    output
}
