//! # Workflow Orchestrator
//!
//! Sequential executor for workflow plans. Owns the progress ledger for the
//! run, consults the health checker as a readiness oracle before gated steps,
//! retries retryable steps with bounded backoff, and compensates completed
//! steps in reverse order when a step fails terminally.
//!
//! The orchestrator propagates only a final [`RunSummary`]; step-level detail
//! lives in the [`WorkflowProgress`] ledger so callers never need to catch
//! errors to learn what happened.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use serde::Serialize;
use tokio::sync::{Notify, RwLock};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EnvflowConfig;
use crate::health::{HealthChecker, HealthStatus};
use crate::logging::log_workflow_operation;
use crate::resilience::BackoffCalculator;

use super::events::{EventPublisher, WorkflowEvent};
use super::plan::WorkflowPlan;
use super::progress::{RunOutcome, RunState, StepState, WorkflowProgress};
use super::step::{StepAction, StepContext, WorkflowStep};

/// Cooperative cancellation handle for a run.
///
/// Cancellation is observed between steps; a cancellation that lands while a
/// step action is in flight fails that step and enters the standard rollback
/// path, so state is never corrupted.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Final outcome of a run, alongside the full per-step history.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    /// Step whose terminal failure ended execution, if any.
    pub failed_step: Option<String>,
    /// Non-fatal observations (degraded gates, missing compensators).
    pub warnings: Vec<String>,
    /// Compensating actions that themselves failed; non-empty means the
    /// system may be in a partially-modified state.
    pub rollback_errors: Vec<String>,
    /// Final state of the progress ledger.
    pub progress: WorkflowProgress,
}

/// Drives one lifecycle operation for a named component through the plan's
/// state machine. One orchestration run executes at a time per instance; the
/// ledger is exclusively owned here and exposed only as cloned snapshots.
pub struct WorkflowOrchestrator {
    config: EnvflowConfig,
    health: Arc<HealthChecker>,
    handlers: HashMap<String, Arc<dyn StepAction>>,
    events: EventPublisher,
    backoff: BackoffCalculator,
    progress: Arc<RwLock<Option<WorkflowProgress>>>,
    cancel_flag: Arc<AtomicBool>,
    cancel_notify: Arc<Notify>,
}

impl WorkflowOrchestrator {
    pub fn new(config: EnvflowConfig, health: Arc<HealthChecker>) -> Self {
        let events = EventPublisher::new(config.event_channel_capacity);
        let backoff = BackoffCalculator::new(config.retry.clone());
        Self {
            config,
            health,
            handlers: HashMap::new(),
            events,
            backoff,
            progress: Arc::new(RwLock::new(None)),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            cancel_notify: Arc::new(Notify::new()),
        }
    }

    /// Register the action (and optional compensator) for a step name.
    pub fn register_handler(&mut self, step_name: impl Into<String>, handler: Arc<dyn StepAction>) {
        self.handlers.insert(step_name.into(), handler);
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        CancellationHandle {
            flag: Arc::clone(&self.cancel_flag),
            notify: Arc::clone(&self.cancel_notify),
        }
    }

    /// Read-only snapshot of the current run's ledger, for polling callers.
    pub async fn progress(&self) -> Option<WorkflowProgress> {
        self.progress.read().await.clone()
    }

    /// Execute the plan to its terminal outcome.
    pub async fn run(&self, plan: &WorkflowPlan) -> RunSummary {
        let run_id = Uuid::new_v4();
        let mut ledger = WorkflowProgress::new(run_id, plan.step_names());
        self.sync_progress(&ledger).await;

        info!(
            run_id = %run_id,
            step_count = plan.len(),
            "🚀 Workflow run started"
        );
        self.events.publish(WorkflowEvent::RunStarted {
            run_id,
            step_count: plan.len(),
        });

        ledger.set_run_state(RunState::Executing);
        self.sync_progress(&ledger).await;

        let mut warnings: Vec<String> = Vec::new();
        let mut rollback_errors: Vec<String> = Vec::new();
        let mut completed: Vec<String> = Vec::new();
        let mut failure: Option<(String, String)> = None;
        let mut cancelled = false;

        for step in plan.steps() {
            if self.cancel_flag.load(Ordering::SeqCst) {
                cancelled = true;
                warnings.push(format!("run cancelled before step {}", step.name));
                break;
            }

            if step.health_gate {
                if let Some(message) = self.evaluate_health_gate(run_id, step, &mut warnings).await
                {
                    ledger.transition(&step.name, StepState::Failed, Some(message.clone()));
                    self.sync_progress(&ledger).await;
                    self.events.publish(WorkflowEvent::StepFailed {
                        run_id,
                        step_name: step.name.clone(),
                        message: message.clone(),
                    });
                    failure = Some((step.name.clone(), message));
                    break;
                }
            }

            let Some(handler) = self.handlers.get(&step.name) else {
                let message = format!("no handler registered for step {}", step.name);
                error!(run_id = %run_id, step = %step.name, "{message}");
                ledger.transition(&step.name, StepState::Failed, Some(message.clone()));
                self.sync_progress(&ledger).await;
                self.events.publish(WorkflowEvent::StepFailed {
                    run_id,
                    step_name: step.name.clone(),
                    message: message.clone(),
                });
                failure = Some((step.name.clone(), message));
                break;
            };

            ledger.transition(&step.name, StepState::Running, None);
            self.sync_progress(&ledger).await;

            let max_attempts = if step.retryable {
                self.config.retry.max_attempts
            } else {
                1
            };
            let mut attempt = 1u32;
            loop {
                ledger.record_attempt(&step.name);
                self.sync_progress(&ledger).await;
                self.events.publish(WorkflowEvent::StepStarted {
                    run_id,
                    step_name: step.name.clone(),
                    attempt,
                });

                match self
                    .execute_step_once(run_id, step, handler.as_ref(), attempt)
                    .await
                {
                    Ok(_output) => {
                        ledger.transition(&step.name, StepState::Succeeded, None);
                        self.sync_progress(&ledger).await;
                        self.events.publish(WorkflowEvent::StepSucceeded {
                            run_id,
                            step_name: step.name.clone(),
                        });
                        log_workflow_operation(
                            "step_execution",
                            Some(run_id),
                            Some(&step.name),
                            "succeeded",
                            None,
                        );
                        completed.push(step.name.clone());
                        break;
                    }
                    Err(message) => {
                        let cancel_seen = self.cancel_flag.load(Ordering::SeqCst);
                        if !cancel_seen && attempt < max_attempts {
                            warn!(
                                run_id = %run_id,
                                step = %step.name,
                                attempt,
                                error = %message,
                                "Step failed, retrying after backoff"
                            );
                            self.backoff.wait_after(attempt).await;
                            attempt += 1;
                        } else {
                            ledger.transition(&step.name, StepState::Failed, Some(message.clone()));
                            self.sync_progress(&ledger).await;
                            self.events.publish(WorkflowEvent::StepFailed {
                                run_id,
                                step_name: step.name.clone(),
                                message: message.clone(),
                            });
                            log_workflow_operation(
                                "step_execution",
                                Some(run_id),
                                Some(&step.name),
                                "failed",
                                Some(&message),
                            );
                            failure = Some((step.name.clone(), message));
                            break;
                        }
                    }
                }
            }

            if failure.is_some() {
                break;
            }
        }

        let outcome = if let Some((failed_name, _)) = &failure {
            let reason = format!("run aborted after failure of {failed_name}");
            self.skip_remaining(run_id, plan, &mut ledger, Some(failed_name.as_str()), &reason)
                .await;
            self.rollback(
                run_id,
                plan,
                &mut ledger,
                &completed,
                &mut warnings,
                &mut rollback_errors,
                &reason,
            )
            .await
        } else if cancelled {
            let reason = "run cancelled".to_string();
            self.skip_remaining(run_id, plan, &mut ledger, None, &reason)
                .await;
            self.rollback(
                run_id,
                plan,
                &mut ledger,
                &completed,
                &mut warnings,
                &mut rollback_errors,
                &reason,
            )
            .await
        } else {
            RunOutcome::Completed
        };

        ledger.set_run_state(outcome.as_run_state());
        self.sync_progress(&ledger).await;
        self.events
            .publish(WorkflowEvent::RunFinished { run_id, outcome });

        match outcome {
            RunOutcome::Completed => {
                info!(run_id = %run_id, "🟢 Workflow run completed");
            }
            RunOutcome::RolledBack => {
                warn!(
                    run_id = %run_id,
                    failed_step = failure.as_ref().map(|f| f.0.as_str()),
                    "🟡 Workflow run rolled back"
                );
            }
            RunOutcome::Failed => {
                error!(
                    run_id = %run_id,
                    failed_step = failure.as_ref().map(|f| f.0.as_str()),
                    rollback_errors = rollback_errors.len(),
                    "🔴 Workflow run failed"
                );
            }
        }
        log_workflow_operation(
            "workflow_run",
            Some(run_id),
            None,
            &outcome.to_string(),
            failure.as_ref().map(|f| f.1.as_str()),
        );

        RunSummary {
            run_id,
            outcome,
            failed_step: failure.map(|f| f.0),
            warnings,
            rollback_errors,
            progress: ledger,
        }
    }

    /// Consult the health checker before a gated step. Returns the failure
    /// message when the gate blocks the step.
    async fn evaluate_health_gate(
        &self,
        run_id: Uuid,
        step: &WorkflowStep,
        warnings: &mut Vec<String>,
    ) -> Option<String> {
        let results = self.health.comprehensive_check(Some(&step.component)).await;
        let aggregate = HealthChecker::aggregate_status(&results);

        match aggregate {
            HealthStatus::Unhealthy => {
                let detail = results
                    .values()
                    .find(|r| r.status == HealthStatus::Unhealthy)
                    .map(|r| format!("{}: {}", r.check_name, r.message))
                    .unwrap_or_else(|| "aggregate status unhealthy".to_string());
                self.events.publish(WorkflowEvent::HealthGateBlocked {
                    run_id,
                    step_name: step.name.clone(),
                    aggregate,
                });
                warn!(
                    run_id = %run_id,
                    step = %step.name,
                    component = %step.component,
                    "Health gate blocked step"
                );
                Some(format!("health precondition failed: {detail}"))
            }
            HealthStatus::Healthy => None,
            other => {
                warnings.push(format!(
                    "step {}: health aggregate {other} at readiness gate",
                    step.name
                ));
                None
            }
        }
    }

    /// One bounded attempt of a step action. Cancellation mid-step surfaces
    /// as a failure of this attempt rather than corrupting state.
    async fn execute_step_once(
        &self,
        run_id: Uuid,
        step: &WorkflowStep,
        handler: &dyn StepAction,
        attempt: u32,
    ) -> Result<serde_json::Value, String> {
        let ctx = StepContext {
            run_id,
            step: step.clone(),
            attempt,
        };
        tokio::select! {
            _ = self.cancel_notify.notified() => Err("cancelled during execution".to_string()),
            result = timeout(self.config.step_timeout(), handler.execute(&ctx)) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(format!("{error:#}")),
                Err(_) => Err(format!("timeout after {}ms", self.config.step_timeout_ms)),
            },
        }
    }

    /// Mark every step still pending as skipped once the run stops early.
    /// Steps downstream of the failed step are labelled with the dependency
    /// that failed them; everything else gets the fallback reason.
    async fn skip_remaining(
        &self,
        run_id: Uuid,
        plan: &WorkflowPlan,
        ledger: &mut WorkflowProgress,
        failed_step: Option<&str>,
        fallback_reason: &str,
    ) {
        let dependents: std::collections::HashSet<String> = failed_step
            .map(|name| plan.transitive_dependents(name).into_iter().collect())
            .unwrap_or_default();
        let pending: Vec<String> = ledger
            .steps_in(StepState::Pending)
            .into_iter()
            .map(str::to_string)
            .collect();
        for name in pending {
            let reason = match failed_step {
                Some(failed) if dependents.contains(&name) => {
                    format!("dependency {failed} failed")
                }
                _ => fallback_reason.to_string(),
            };
            debug!(run_id = %run_id, step = %name, %reason, "Skipping step");
            ledger.transition(&name, StepState::Skipped, Some(reason.clone()));
            self.events.publish(WorkflowEvent::StepSkipped {
                run_id,
                step_name: name,
                reason,
            });
        }
        self.sync_progress(ledger).await;
    }

    /// Walk already-succeeded steps in reverse completion order, invoking
    /// each registered compensator. A step with no compensator is marked
    /// skipped and the omission surfaced as a warning, never dropped.
    #[allow(clippy::too_many_arguments)]
    async fn rollback(
        &self,
        run_id: Uuid,
        plan: &WorkflowPlan,
        ledger: &mut WorkflowProgress,
        completed: &[String],
        warnings: &mut Vec<String>,
        rollback_errors: &mut Vec<String>,
        reason: &str,
    ) -> RunOutcome {
        if completed.is_empty() {
            // Nothing succeeded, so there is nothing to compensate.
            return RunOutcome::Failed;
        }

        warn!(
            run_id = %run_id,
            steps = completed.len(),
            %reason,
            "⚠️ Rolling back completed steps"
        );
        self.events.publish(WorkflowEvent::RollbackStarted {
            run_id,
            reason: reason.to_string(),
        });

        for name in completed.iter().rev() {
            let (Some(step), Some(handler)) = (plan.step(name), self.handlers.get(name)) else {
                continue;
            };

            if !handler.supports_compensation() {
                let message = "no compensating action registered".to_string();
                ledger.transition(name, StepState::Skipped, Some(message));
                self.sync_progress(ledger).await;
                warnings.push(format!(
                    "step {name} has no compensating action and was left in place"
                ));
                warn!(run_id = %run_id, step = %name, "Compensation skipped: none registered");
                self.events.publish(WorkflowEvent::CompensationSkipped {
                    run_id,
                    step_name: name.clone(),
                });
                continue;
            }

            let ctx = StepContext {
                run_id,
                step: step.clone(),
                attempt: 1,
            };
            match timeout(self.config.step_timeout(), handler.compensate(&ctx)).await {
                Ok(Ok(())) => {
                    ledger.transition(name, StepState::RolledBack, None);
                    self.sync_progress(ledger).await;
                    self.events.publish(WorkflowEvent::StepRolledBack {
                        run_id,
                        step_name: name.clone(),
                    });
                }
                Ok(Err(error)) => {
                    let message = format!("compensating action failed: {error:#}");
                    ledger.transition(name, StepState::Failed, Some(message.clone()));
                    self.sync_progress(ledger).await;
                    error!(run_id = %run_id, step = %name, "🔴 {message}");
                    rollback_errors.push(format!("{name}: {message}"));
                }
                Err(_) => {
                    let message = format!(
                        "compensating action timeout after {}ms",
                        self.config.step_timeout_ms
                    );
                    ledger.transition(name, StepState::Failed, Some(message.clone()));
                    self.sync_progress(ledger).await;
                    error!(run_id = %run_id, step = %name, "🔴 {message}");
                    rollback_errors.push(format!("{name}: {message}"));
                }
            }
        }

        if rollback_errors.is_empty() {
            RunOutcome::RolledBack
        } else {
            RunOutcome::Failed
        }
    }

    async fn sync_progress(&self, ledger: &WorkflowProgress) {
        *self.progress.write().await = Some(ledger.clone());
    }
}
