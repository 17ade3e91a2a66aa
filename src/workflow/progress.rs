use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Per-step state within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Initial state when the plan is built
    Pending,
    /// Step action is executing
    Running,
    /// Step action completed successfully
    Succeeded,
    /// Step action failed terminally, or its compensator failed
    Failed,
    /// Step was compensated during rollback
    RolledBack,
    /// Step never ran (failed dependency, cancellation) or had no
    /// compensator to run during rollback
    Skipped,
}

impl StepState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::RolledBack | Self::Skipped
        )
    }

    /// Check if this step satisfies dependencies for other steps
    pub fn satisfies_dependencies(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl Default for StepState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::RolledBack => write!(f, "rolled_back"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for StepState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "rolled_back" => Ok(Self::RolledBack),
            "skipped" => Ok(Self::Skipped),
            _ => Err(format!("Invalid step state: {s}")),
        }
    }
}

/// Overall state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Planning,
    Executing,
    Completed,
    Failed,
    RolledBack,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::RolledBack)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Executing => write!(f, "executing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// Terminal outcome of a run, the only value the orchestrator propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every planned step succeeded
    Completed,
    /// Execution failed and compensation was impossible or itself failed
    Failed,
    /// Execution failed and every attempted compensator succeeded
    RolledBack,
}

impl RunOutcome {
    pub fn as_run_state(&self) -> RunState {
        match self {
            Self::Completed => RunState::Completed,
            Self::Failed => RunState::Failed,
            Self::RolledBack => RunState::RolledBack,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_run_state().fmt(f)
    }
}

/// Ledger entry for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub state: StepState,
    pub attempts: u32,
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StepRecord {
    fn pending() -> Self {
        Self {
            state: StepState::Pending,
            attempts: 0,
            message: None,
            updated_at: Utc::now(),
        }
    }
}

/// Mutable progress ledger for one run, exclusively owned by the
/// orchestrator executing it. Steps report outcomes; only the orchestrator
/// applies transitions. Discarded at run completion, no cross-run state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowProgress {
    pub run_id: Uuid,
    pub run_state: RunState,
    records: BTreeMap<String, StepRecord>,
}

impl WorkflowProgress {
    pub fn new<'a, I>(run_id: Uuid, step_names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            run_id,
            run_state: RunState::Planning,
            records: step_names
                .into_iter()
                .map(|name| (name.to_string(), StepRecord::pending()))
                .collect(),
        }
    }

    pub(crate) fn set_run_state(&mut self, state: RunState) {
        self.run_state = state;
    }

    pub(crate) fn transition(&mut self, step_name: &str, state: StepState, message: Option<String>) {
        if let Some(record) = self.records.get_mut(step_name) {
            record.state = state;
            record.message = message;
            record.updated_at = Utc::now();
        }
    }

    pub(crate) fn record_attempt(&mut self, step_name: &str) {
        if let Some(record) = self.records.get_mut(step_name) {
            record.attempts += 1;
            record.updated_at = Utc::now();
        }
    }

    pub fn state_of(&self, step_name: &str) -> Option<StepState> {
        self.records.get(step_name).map(|r| r.state)
    }

    pub fn record(&self, step_name: &str) -> Option<&StepRecord> {
        self.records.get(step_name)
    }

    /// Records keyed by step name, stable name-ordered iteration.
    pub fn records(&self) -> &BTreeMap<String, StepRecord> {
        &self.records
    }

    /// Step names currently in the given state, name-ordered.
    pub fn steps_in(&self, state: StepState) -> Vec<&str> {
        self.records
            .iter()
            .filter(|(_, record)| record.state == state)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// A dependency is satisfied only by a succeeded step.
    pub fn dependency_satisfied(&self, step_name: &str) -> bool {
        self.state_of(step_name)
            .map(|s| s.satisfies_dependencies())
            .unwrap_or(false)
    }
}
