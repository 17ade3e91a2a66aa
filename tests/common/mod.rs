//! Shared test doubles for the integration suite: scriptable probes for the
//! health checker and a recording step action for the orchestrator.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use envflow_core::config::{EnvflowConfig, Topology};
use envflow_core::health::{
    DatabasePing, HealthChecker, HttpProbe, HttpProbeResponse, ProcessInspector, ProcessState,
    ResourceSampler, ResourceUsage,
};
use envflow_core::workflow::{StepAction, StepContext};

/// Config with millisecond-scale timeouts so failure paths run fast.
pub fn fast_config() -> EnvflowConfig {
    let mut config = EnvflowConfig::default();
    config.check_timeout_ms = 25;
    config.step_timeout_ms = 200;
    config.api_latency_degraded_ms = 50;
    config.retry.max_attempts = 2;
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 4;
    config.event_channel_capacity = 64;
    config
}

#[derive(Clone)]
pub enum DbBehavior {
    Healthy(Duration),
    Fail(String),
    /// Sleep this long before answering, to trip the checker's timeout.
    Hang(Duration),
}

pub struct MockDatabase {
    pub behavior: DbBehavior,
}

#[async_trait]
impl DatabasePing for MockDatabase {
    async fn ping(&self, _target: &str) -> anyhow::Result<Duration> {
        match &self.behavior {
            DbBehavior::Healthy(latency) => Ok(*latency),
            DbBehavior::Fail(message) => anyhow::bail!("{message}"),
            DbBehavior::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(*delay)
            }
        }
    }
}

#[derive(Clone)]
pub enum HttpBehavior {
    Respond { status: u16, latency: Duration },
    Fail(String),
    Hang(Duration),
}

#[derive(Default)]
pub struct MockHttp {
    pub behaviors: HashMap<String, HttpBehavior>,
}

#[async_trait]
impl HttpProbe for MockHttp {
    async fn probe(&self, url: &str) -> anyhow::Result<HttpProbeResponse> {
        match self.behaviors.get(url) {
            Some(HttpBehavior::Respond { status, latency }) => Ok(HttpProbeResponse {
                status_code: *status,
                latency: *latency,
            }),
            Some(HttpBehavior::Fail(message)) => anyhow::bail!("{message}"),
            Some(HttpBehavior::Hang(delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(HttpProbeResponse {
                    status_code: 200,
                    latency: *delay,
                })
            }
            None => anyhow::bail!("no route to {url}"),
        }
    }
}

#[derive(Default)]
pub struct MockProcesses {
    pub states: HashMap<String, ProcessState>,
}

impl MockProcesses {
    pub fn with(states: &[(&str, ProcessState)]) -> Self {
        Self {
            states: states
                .iter()
                .map(|(id, state)| ((*id).to_string(), state.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl ProcessInspector for MockProcesses {
    async fn inspect(&self, identifier: &str) -> anyhow::Result<ProcessState> {
        Ok(self
            .states
            .get(identifier)
            .cloned()
            .unwrap_or(ProcessState::NotFound))
    }
}

pub enum ResourceBehavior {
    Usage(ResourceUsage),
    Unreadable(String),
}

#[derive(Default)]
pub struct MockResources {
    pub behaviors: HashMap<String, ResourceBehavior>,
}

#[async_trait]
impl ResourceSampler for MockResources {
    async fn sample(&self, target: &str) -> anyhow::Result<ResourceUsage> {
        match self.behaviors.get(target) {
            Some(ResourceBehavior::Usage(usage)) => Ok(usage.clone()),
            Some(ResourceBehavior::Unreadable(message)) => anyhow::bail!("{message}"),
            None => anyhow::bail!("no sampler for {target}"),
        }
    }
}

/// Assemble a checker from individual mocks, defaulting anything unused.
pub struct CheckerBuilder {
    pub config: EnvflowConfig,
    pub topology: Topology,
    pub database: MockDatabase,
    pub http: MockHttp,
    pub processes: MockProcesses,
    pub resources: MockResources,
}

impl CheckerBuilder {
    pub fn new(topology: Topology) -> Self {
        Self {
            config: fast_config(),
            topology,
            database: MockDatabase {
                behavior: DbBehavior::Fail("no database configured".to_string()),
            },
            http: MockHttp::default(),
            processes: MockProcesses::default(),
            resources: MockResources::default(),
        }
    }

    pub fn build(self) -> Arc<HealthChecker> {
        Arc::new(
            HealthChecker::new(
                self.config,
                self.topology,
                Arc::new(self.database),
                Arc::new(self.http),
                Arc::new(self.processes),
                Arc::new(self.resources),
            )
            .expect("test topology must validate"),
        )
    }
}

/// Checker over an empty topology; comprehensive checks aggregate healthy.
pub fn healthy_checker() -> Arc<HealthChecker> {
    CheckerBuilder::new(Topology::default()).build()
}

/// Step action that records invocations and can be scripted to fail, hang,
/// or refuse compensation.
pub struct RecordingAction {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    fail_first: u32,
    always_fail: bool,
    compensable: bool,
    fail_compensation: bool,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl RecordingAction {
    pub fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            log,
            fail_first: 0,
            always_fail: false,
            compensable: false,
            fail_compensation: false,
            delay: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Fail the first `n` execute attempts, then succeed.
    pub fn flaky(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    pub fn failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    pub fn compensable(mut self) -> Self {
        self.compensable = true;
        self
    }

    pub fn with_failing_compensation(mut self) -> Self {
        self.compensable = true;
        self.fail_compensation = true;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl StepAction for RecordingAction {
    async fn execute(&self, _ctx: &StepContext) -> anyhow::Result<serde_json::Value> {
        self.log
            .lock()
            .unwrap()
            .push(format!("execute:{}", self.name));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.always_fail {
            anyhow::bail!("simulated failure in {}", self.name);
        }
        if attempt <= self.fail_first {
            anyhow::bail!("transient failure in {} (attempt {attempt})", self.name);
        }
        Ok(serde_json::json!({ "step": self.name }))
    }

    fn supports_compensation(&self) -> bool {
        self.compensable
    }

    async fn compensate(&self, _ctx: &StepContext) -> anyhow::Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("compensate:{}", self.name));
        if self.fail_compensation {
            anyhow::bail!("compensation exploded in {}", self.name);
        }
        Ok(())
    }
}

pub fn action_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn log_entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().unwrap().clone()
}
