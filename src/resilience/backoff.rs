//! # Bounded Exponential Backoff
//!
//! Retry policy and delay calculation for operations that talk to external
//! services. Delays grow geometrically from a base and are capped at a
//! maximum, with no jitter: identical inputs always produce identical delays,
//! which tests rely on.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy configuration.
///
/// `max_attempts` counts the initial attempt, so `max_attempts = 3` means one
/// try plus up to two retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given attempt number (1-based) fails.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let exponent = (attempt - 1).min(31);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent as i32);
        let raw_ms = (self.base_delay_ms as f64 * factor).round();
        let capped_ms = if raw_ms.is_finite() {
            (raw_ms as u64).min(self.max_delay_ms)
        } else {
            self.max_delay_ms
        };
        Duration::from_millis(capped_ms)
    }

    /// Whether another attempt is allowed after `attempt` attempts have run.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Stateless delay calculator wrapping a [`RetryPolicy`].
///
/// Exists so callers that manage their own retry loops (the orchestrator's
/// step execution path) share delay arithmetic with [`retry_with_backoff`].
#[derive(Debug, Clone)]
pub struct BackoffCalculator {
    policy: RetryPolicy,
}

impl BackoffCalculator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.policy.delay_for_attempt(attempt)
    }

    /// Sleep for the delay owed after a failed attempt.
    pub async fn wait_after(&self, attempt: u32) {
        tokio::time::sleep(self.delay_for_attempt(attempt)).await;
    }
}

/// Run `operation` up to `policy.max_attempts` times, sleeping the policy's
/// backoff delay between failures. The closure receives the 1-based attempt
/// number. The final error is returned unchanged once attempts exhaust.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if policy.allows_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = %operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Operation failed, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
