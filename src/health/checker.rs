//! # Health Checker
//!
//! Runs the battery of environment checks and aggregates a worst-of verdict.
//!
//! Checks that talk to external services (database connectivity, API
//! endpoints, service interdependencies) are retried with bounded backoff
//! before settling on unhealthy. Checks that read local state (process
//! liveness, resource usage) are not retried: a single failed read is
//! authoritative for that instant.
//!
//! Independent check families are dispatched concurrently to reduce latency,
//! then merged by fixed check-name ordering so the aggregate result is
//! deterministic regardless of completion order.

use futures::future::join_all;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::{EnvflowConfig, Topology};
use crate::error::Result;
use crate::logging::log_check_operation;
use crate::resilience::retry_with_backoff;

use super::probes::{DatabasePing, HttpProbe, ProcessInspector, ProcessState, ResourceSampler};
use super::types::{HealthCheckResult, HealthStatus};

/// Stateless health check service. Holds no mutable state between calls;
/// every invocation is independent and side-effect free.
pub struct HealthChecker {
    config: EnvflowConfig,
    topology: Topology,
    database: Arc<dyn DatabasePing>,
    http: Arc<dyn HttpProbe>,
    process: Arc<dyn ProcessInspector>,
    resources: Arc<dyn ResourceSampler>,
}

impl HealthChecker {
    /// Create a checker from an immutable configuration snapshot and probe
    /// implementations. Fails fast on an invalid config or topology so no
    /// check can run against a broken dependency graph.
    pub fn new(
        config: EnvflowConfig,
        topology: Topology,
        database: Arc<dyn DatabasePing>,
        http: Arc<dyn HttpProbe>,
        process: Arc<dyn ProcessInspector>,
        resources: Arc<dyn ResourceSampler>,
    ) -> Result<Self> {
        config.validate()?;
        topology.validate()?;
        Ok(Self {
            config,
            topology,
            database,
            http,
            process,
            resources,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Attempt a lightweight database ping. Retried with backoff; every
    /// failure mode is converted into an unhealthy result.
    pub async fn check_database_connectivity(&self, target: &str) -> HealthCheckResult {
        let started = Instant::now();
        let outcome = retry_with_backoff(&self.config.retry, "database_connectivity", move |_| {
            self.ping_database_once(target)
        })
        .await;

        match outcome {
            Ok(latency) => HealthCheckResult::healthy(
                "database",
                format!("ping succeeded against {target}"),
                latency,
            ),
            Err(message) => HealthCheckResult::unhealthy("database", message, started.elapsed()),
        }
    }

    async fn ping_database_once(&self, target: &str) -> std::result::Result<std::time::Duration, String> {
        match timeout(self.config.check_timeout(), self.database.ping(target)).await {
            Ok(Ok(latency)) => Ok(latency),
            Ok(Err(error)) => Err(format!("{error:#}")),
            Err(_) => Err(format!(
                "timeout after {}ms pinging {target}",
                self.config.check_timeout_ms
            )),
        }
    }

    /// Issue a bounded-time probe against an API endpoint. Timeout or
    /// non-success response is unhealthy; a slow success is degraded.
    pub async fn check_api_endpoint(&self, name: &str, url: &str) -> HealthCheckResult {
        let check_name = format!("api:{name}");
        let started = Instant::now();
        let outcome = retry_with_backoff(&self.config.retry, "api_endpoint", move |_| {
            self.probe_api_once(url)
        })
        .await;

        match outcome {
            Ok(response) if response.latency > self.config.api_latency_degraded() => {
                HealthCheckResult::degraded(
                    check_name,
                    format!(
                        "status {} in {}ms exceeds {}ms threshold",
                        response.status_code,
                        response.latency.as_millis(),
                        self.config.api_latency_degraded_ms
                    ),
                    response.latency,
                )
            }
            Ok(response) => HealthCheckResult::healthy(
                check_name,
                format!("status {}", response.status_code),
                response.latency,
            ),
            Err(message) => HealthCheckResult::unhealthy(check_name, message, started.elapsed()),
        }
    }

    async fn probe_api_once(
        &self,
        url: &str,
    ) -> std::result::Result<super::probes::HttpProbeResponse, String> {
        match timeout(self.config.check_timeout(), self.http.probe(url)).await {
            Ok(Ok(response)) if response.is_success() => Ok(response),
            Ok(Ok(response)) => Err(format!(
                "unexpected status {} from {url}",
                response.status_code
            )),
            Ok(Err(error)) => Err(format!("{error:#}")),
            Err(_) => Err(format!(
                "timeout after {}ms probing {url}",
                self.config.check_timeout_ms
            )),
        }
    }

    /// Verify an expected process/container is running. A single read is
    /// authoritative: local state is never retried.
    pub async fn check_process_liveness(
        &self,
        component: &str,
        identifier: &str,
    ) -> HealthCheckResult {
        let check_name = format!("process:{component}");
        let started = Instant::now();
        match timeout(self.config.check_timeout(), self.process.inspect(identifier)).await {
            Ok(Ok(ProcessState::Running)) => HealthCheckResult::healthy(
                check_name,
                format!("{identifier} is running"),
                started.elapsed(),
            ),
            Ok(Ok(ProcessState::RestartLooping { restarts })) => HealthCheckResult::degraded(
                check_name,
                format!("{identifier} is restart-looping ({restarts} recent restarts)"),
                started.elapsed(),
            ),
            Ok(Ok(ProcessState::Stopped)) => HealthCheckResult::unhealthy(
                check_name,
                format!("{identifier} is stopped"),
                started.elapsed(),
            ),
            Ok(Ok(ProcessState::NotFound)) => HealthCheckResult::unhealthy(
                check_name,
                format!("{identifier} not found"),
                started.elapsed(),
            ),
            Ok(Err(error)) => {
                HealthCheckResult::unhealthy(check_name, format!("{error:#}"), started.elapsed())
            }
            Err(_) => HealthCheckResult::unhealthy(
                check_name,
                format!(
                    "timeout after {}ms inspecting {identifier}",
                    self.config.check_timeout_ms
                ),
                started.elapsed(),
            ),
        }
    }

    /// Walk a component's declared dependency set transitively, in
    /// declaration order. Traversal stops at the first unreachable dependency
    /// but every already-produced result is still returned.
    pub async fn check_service_interdependencies(
        &self,
        component: &str,
    ) -> Vec<HealthCheckResult> {
        let mut results = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, String)> = self
            .topology
            .dependencies_of(component)
            .iter()
            .map(|dep| (component.to_string(), dep.clone()))
            .collect();

        while let Some((parent, dep)) = queue.pop_front() {
            if !visited.insert(dep.clone()) {
                continue;
            }

            let check_name = format!("dependency:{parent}->{dep}");
            let started = Instant::now();
            let result = match self.topology.process_identifier(&dep) {
                None => HealthCheckResult::unknown(
                    check_name,
                    format!("no process target declared for {dep}"),
                    started.elapsed(),
                ),
                Some(identifier) => {
                    let outcome =
                        retry_with_backoff(&self.config.retry, "service_interdependency", move |_| {
                            self.reach_dependency_once(identifier)
                        })
                        .await;
                    match outcome {
                        Ok(ProcessState::RestartLooping { restarts }) => {
                            HealthCheckResult::degraded(
                                check_name,
                                format!("{dep} reachable but restart-looping ({restarts} recent restarts)"),
                                started.elapsed(),
                            )
                        }
                        Ok(_) => HealthCheckResult::healthy(
                            check_name,
                            format!("{dep} reachable"),
                            started.elapsed(),
                        ),
                        Err(message) => {
                            HealthCheckResult::unhealthy(check_name, message, started.elapsed())
                        }
                    }
                }
            };

            let status = result.status;
            results.push(result);

            if status == HealthStatus::Unhealthy {
                // First unreachable dependency halts the traversal; partial
                // results already collected are surfaced, not discarded.
                break;
            }

            for child in self.topology.dependencies_of(&dep) {
                queue.push_back((dep.clone(), child.clone()));
            }
        }

        results
    }

    async fn reach_dependency_once(
        &self,
        identifier: &str,
    ) -> std::result::Result<ProcessState, String> {
        match timeout(self.config.check_timeout(), self.process.inspect(identifier)).await {
            Ok(Ok(state @ (ProcessState::Running | ProcessState::RestartLooping { .. }))) => {
                Ok(state)
            }
            Ok(Ok(ProcessState::Stopped)) => Err(format!("{identifier} is stopped")),
            Ok(Ok(ProcessState::NotFound)) => Err(format!("{identifier} not found")),
            Ok(Err(error)) => Err(format!("{error:#}")),
            Err(_) => Err(format!(
                "timeout after {}ms inspecting {identifier}",
                self.config.check_timeout_ms
            )),
        }
    }

    /// Sample resource counters, one result per target. Unreadable metrics
    /// become unknown-status entries; this call never fails as a whole and
    /// never blocks beyond the per-target timeout.
    pub async fn check_resource_usage(&self, targets: &[String]) -> Vec<HealthCheckResult> {
        join_all(targets.iter().map(|target| self.sample_resource(target))).await
    }

    async fn sample_resource(&self, target: &str) -> HealthCheckResult {
        let check_name = format!("resource:{target}");
        let started = Instant::now();
        match timeout(self.config.check_timeout(), self.resources.sample(target)).await {
            Ok(Ok(usage)) => {
                let details = serde_json::to_value(&usage).ok();
                let over_threshold = usage
                    .utilization()
                    .is_some_and(|u| u >= self.config.resource_degraded_utilization);
                let mut result = if usage.is_overcommitted() {
                    HealthCheckResult::degraded(
                        check_name,
                        format!("{usage} is overcommitted"),
                        started.elapsed(),
                    )
                } else if over_threshold {
                    HealthCheckResult::degraded(
                        check_name,
                        format!(
                            "{usage} at or above {:.0}% utilization",
                            self.config.resource_degraded_utilization * 100.0
                        ),
                        started.elapsed(),
                    )
                } else {
                    HealthCheckResult::healthy(
                        check_name,
                        usage.to_string(),
                        started.elapsed(),
                    )
                };
                if let Some(details) = details {
                    result = result.with_details(details);
                }
                result
            }
            Ok(Err(error)) => HealthCheckResult::unknown(
                check_name,
                format!("metric unreadable: {error:#}"),
                started.elapsed(),
            ),
            Err(_) => HealthCheckResult::unknown(
                check_name,
                format!(
                    "metric unreadable: timeout after {}ms",
                    self.config.check_timeout_ms
                ),
                started.elapsed(),
            ),
        }
    }

    /// Run the applicable subset of checks (scope-filtered when a component
    /// is given) and return the full result set keyed by check name.
    ///
    /// The returned map iterates in check-name order, stable across calls for
    /// the same input set. Aggregate status is the worst individual status.
    pub async fn comprehensive_check(
        &self,
        component: Option<&str>,
    ) -> BTreeMap<String, HealthCheckResult> {
        let started = Instant::now();
        let scoped: Vec<_> = self
            .topology
            .processes
            .iter()
            .filter(|p| component.map_or(true, |c| p.component == c))
            .collect();

        let database_check = async {
            match &self.topology.database_target {
                Some(target) => Some(self.check_database_connectivity(target).await),
                None => None,
            }
        };
        let api_checks = join_all(
            self.topology
                .api_endpoints
                .iter()
                .map(|endpoint| self.check_api_endpoint(&endpoint.name, &endpoint.url)),
        );
        let resource_checks = self.check_resource_usage(&self.topology.resource_targets);
        let process_checks = join_all(
            scoped
                .iter()
                .map(|p| self.check_process_liveness(&p.component, &p.identifier)),
        );

        let (database, apis, resources, processes) =
            tokio::join!(database_check, api_checks, resource_checks, process_checks);

        let mut results = BTreeMap::new();
        for result in database
            .into_iter()
            .chain(apis)
            .chain(resources)
            .chain(processes)
        {
            results.insert(result.check_name.clone(), result);
        }

        // Dependency traversal is inherently ordered, so it runs after the
        // concurrent families.
        for target in &scoped {
            for result in self.check_service_interdependencies(&target.component).await {
                results.insert(result.check_name.clone(), result);
            }
        }

        let aggregate = Self::aggregate_status(&results);
        for result in results.values() {
            if !result.status.is_operational() {
                log_check_operation(
                    &result.check_name,
                    &result.status.to_string(),
                    Some(result.latency.as_millis() as u64),
                    Some(&result.message),
                );
            } else {
                debug!(
                    check_name = %result.check_name,
                    status = %result.status,
                    latency_ms = result.latency.as_millis() as u64,
                    "Health check result"
                );
            }
        }
        info!(
            component = component,
            aggregate = %aggregate,
            check_count = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "🩺 Comprehensive health check complete"
        );

        results
    }

    /// Worst individual status in a result set, by the ordering
    /// `unhealthy > degraded > unknown > healthy`.
    pub fn aggregate_status(results: &BTreeMap<String, HealthCheckResult>) -> HealthStatus {
        HealthStatus::worst(results.values().map(|r| r.status))
    }
}
