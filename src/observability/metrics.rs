//! Attempt metrics.
//!
//! # Metrics
//! - `rq_attempts_total` (counter): attempts by method and outcome
//! - `rq_retries_total` (counter): retries scheduled, by method
//! - `rq_attempt_duration_seconds` (histogram): attempt latency by method
//!
//! Outcomes are `ok` (2xx/3xx), `status` (4xx and above), `cancelled` and `error`.
//!
//! Callers pass the `enabled` switch of the client that ran the attempt.

use std::time::Instant;

use crate::error::Error;
use crate::response::Response;

/// Outcome label for an attempt.
pub fn outcome(response: &Response) -> &'static str {
    match response.error() {
        Some(Error::Cancelled) => "cancelled",
        Some(_) => "error",
        None if response.is_error() => "status",
        None => "ok",
    }
}

/// Record one finished attempt.
pub fn record_attempt(enabled: bool, method: &str, response: &Response, started: Instant) {
    if !enabled {
        return;
    }
    ::metrics::counter!(
        "rq_attempts_total",
        "method" => method.to_string(),
        "outcome" => outcome(response)
    )
    .increment(1);
    ::metrics::histogram!("rq_attempt_duration_seconds", "method" => method.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// Record a scheduled retry.
pub fn record_retry(enabled: bool, method: &str) {
    if !enabled {
        return;
    }
    ::metrics::counter!("rq_retries_total", "method" => method.to_string()).increment(1);
}
