//! # Resilience Module
//!
//! Bounded retry with exponential backoff, shared by external-service health
//! checks and retryable workflow steps so both surfaces degrade the same way
//! under transient infrastructure failures.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use envflow_core::resilience::{retry_with_backoff, RetryPolicy};
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::default();
//!
//! let value = retry_with_backoff(&policy, "database_ping", |attempt| async move {
//!     if attempt < 2 {
//!         Err("connection refused".to_string())
//!     } else {
//!         Ok(42)
//!     }
//! })
//! .await?;
//! # assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod backoff;

pub use backoff::{retry_with_backoff, BackoffCalculator, RetryPolicy};
