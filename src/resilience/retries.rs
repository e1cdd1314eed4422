//! Retry engine.
//!
//! # Responsibilities
//! - Buffer the request body once so every attempt replays identical bytes
//! - Run attempts strictly in sequence, consulting the retry predicate
//! - Wait between attempts with capped exponential backoff + jitter
//! - Abort the wait when the execution context is cancelled
//!
//! # Design Decisions
//! - Transport errors and 5xx/429 statuses share the default predicate
//! - Exhausting attempts returns the last outcome unchanged
//! - Cancellation is surfaced as the response error, never swallowed

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::StatusCode;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::Error;
use crate::middleware::REQUEST_ID_HEADER;
use crate::observability::metrics;
use crate::request::Request;
use crate::resilience::backoff::scale;
use crate::response::Response;

/// Largest fraction of the current delay added as jitter.
const JITTER_FRACTION: f64 = 0.3;

/// Decides from an attempt's outcome whether another attempt should run.
pub type RetryPredicate = Arc<dyn Fn(&Response) -> bool + Send + Sync>;

/// Retry behaviour for [`Request::send_with_retry`].
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Values ≤ 1 mean one attempt.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for any single wait, jitter included.
    pub max_delay: Duration,
    /// Growth factor per retry. Values below 1.0 are treated as 1.0.
    pub multiplier: f64,
    /// Add up to 30% random jitter to each wait.
    pub jitter: bool,
    retry_if: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
            retry_if: Arc::new(default_retry_if),
        }
    }
}

impl RetryPolicy {
    /// A policy that performs exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Replace the default predicate entirely.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Arc::new(predicate);
        self
    }

    /// Evaluate the configured predicate.
    pub fn should_retry(&self, response: &Response) -> bool {
        (self.retry_if)(response)
    }

    /// Next base delay after `current`, never above the ceiling.
    pub fn next_delay(&self, current: Duration) -> Duration {
        scale(current, self.multiplier.max(1.0), self.max_delay)
    }

    /// The wait actually slept for `delay`: jitter applied, ceiling enforced.
    pub fn wait_for(&self, delay: Duration) -> Duration {
        let delay = delay.min(self.max_delay);
        if !self.jitter {
            return delay;
        }
        let fraction = rand::thread_rng().gen_range(0.0..=JITTER_FRACTION);
        let jitter = scale(delay, fraction, self.max_delay);
        delay.saturating_add(jitter).min(self.max_delay)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
            jitter: config.jitter,
            retry_if: Arc::new(default_retry_if),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

/// Retry on transport-level failures, any 5xx, and 429.
///
/// Other error kinds (interceptor, body, cancellation, ...) are terminal.
pub fn default_retry_if(response: &Response) -> bool {
    match response.error() {
        Some(err) => err.is_retryable(),
        None => response.status().map_or(false, |status| {
            status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
        }),
    }
}

/// Execute `request` under `policy`, returning exactly one response.
pub async fn execute_with_retry(
    mut request: Request,
    cancel: &CancellationToken,
    policy: &RetryPolicy,
) -> Response {
    if let Some(err) = request.take_error() {
        return Response::from_error(err);
    }

    let body = match request.buffer_body().await {
        Ok(body) => body,
        Err(err) => return Response::from_error(err),
    };

    let max_attempts = policy.max_attempts.max(1);
    let method = request.method_ref().to_string();
    let metrics_enabled = request.client_ref().metrics_enabled();
    let request_id = request
        .headers_ref()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let mut delay = policy.base_delay;
    let mut attempt: u32 = 0;

    let mut response = loop {
        let started = Instant::now();
        let replay = body.clone().map_or_else(Body::empty, Body::from);
        let mut response = request.attempt(replay, cancel).await;
        response.set_attempts(attempt + 1);
        metrics::record_attempt(metrics_enabled, &method, &response, started);

        if !policy.should_retry(&response) {
            break response;
        }

        if attempt + 1 >= max_attempts {
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                url = %request.url_ref(),
                attempts = attempt + 1,
                status = response.status_code(),
                "Retries exhausted"
            );
            break response;
        }

        let wait = policy.wait_for(delay);
        tracing::info!(
            request_id = %request_id,
            method = %method,
            url = %request.url_ref(),
            attempt = attempt + 1,
            delay = ?wait,
            status = response.status_code(),
            error = response.error().map(ToString::to_string),
            "Retrying request"
        );
        metrics::record_retry(metrics_enabled, &method);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(attempt = attempt + 1, "Cancelled while waiting to retry");
                response.set_error(Error::Cancelled);
                return response;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        delay = policy.next_delay(delay);
        attempt += 1;
    };

    request.run_validators(&mut response);
    response
}
