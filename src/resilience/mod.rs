//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request::send_with_retry:
//!     → retries.rs (buffer body, run attempts, consult predicate)
//!     → between attempts: wait from the policy, racing cancellation
//!     → backoff.rs (standalone delay curves for custom schedules)
//! ```
//!
//! # Design Decisions
//! - Attempts are strictly sequential; the wait is the only suspension point
//!   outside the exchange itself
//! - Every attempt is bounded by the effective timeout

pub mod backoff;
pub mod retries;

pub use retries::{default_retry_if, execute_with_retry, RetryPolicy, RetryPredicate};
