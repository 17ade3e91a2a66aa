use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle operation a step performs against its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Install,
    Start,
    Stop,
    Status,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Status => write!(f, "status"),
        }
    }
}

impl std::str::FromStr for LifecycleAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(Self::Install),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "status" => Ok(Self::Status),
            _ => Err(format!("Invalid lifecycle action: {s}")),
        }
    }
}

/// A named unit of orchestrated work. Created at plan-build time and
/// immutable during execution; the progress ledger references steps by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    pub component: String,
    pub action: LifecycleAction,
    /// Step names that must succeed before this step runs, declaration order.
    pub depends_on: Vec<String>,
    pub retryable: bool,
    /// Consult the health checker's aggregate verdict before running.
    pub health_gate: bool,
}

impl WorkflowStep {
    pub fn new(
        name: impl Into<String>,
        component: impl Into<String>,
        action: LifecycleAction,
    ) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
            action,
            depends_on: Vec::new(),
            retryable: false,
            health_gate: false,
        }
    }

    pub fn depends_on(mut self, step_name: impl Into<String>) -> Self {
        self.depends_on.push(step_name.into());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn health_gated(mut self) -> Self {
        self.health_gate = true;
        self
    }
}

/// Execution context handed to a step action on each attempt.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub run_id: Uuid,
    pub step: WorkflowStep,
    /// 1-based attempt number for this invocation.
    pub attempt: u32,
}

/// A registered handler for one workflow step.
///
/// Implementations wrap the external container/process manager calls. A
/// handler opts into rollback participation by returning `true` from
/// [`supports_compensation`](StepAction::supports_compensation) and
/// implementing [`compensate`](StepAction::compensate) as the inverse of
/// [`execute`](StepAction::execute).
#[async_trait]
pub trait StepAction: Send + Sync {
    /// Perform the step. The returned value is recorded for observers.
    async fn execute(&self, ctx: &StepContext) -> anyhow::Result<serde_json::Value>;

    /// Whether this handler registers a compensating action.
    fn supports_compensation(&self) -> bool {
        false
    }

    /// Undo a previously succeeded execution during rollback. Only invoked
    /// when [`supports_compensation`](StepAction::supports_compensation)
    /// returns `true`.
    async fn compensate(&self, _ctx: &StepContext) -> anyhow::Result<()> {
        Ok(())
    }
}
