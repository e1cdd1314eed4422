//! Standalone backoff functions.
//!
//! Each builder returns a pure `Fn(attempt) -> Duration` where `attempt` is
//! the 0-based retry index. Results saturate at the cap instead of
//! overflowing, and index 0 yields the base delay.

use std::time::Duration;

/// Always the same delay.
pub fn constant(delay: Duration) -> impl Fn(u32) -> Duration + Clone + Send + Sync {
    move |_attempt| delay
}

/// `base + increment * attempt`, capped at `max`.
pub fn linear(
    base: Duration,
    increment: Duration,
    max: Duration,
) -> impl Fn(u32) -> Duration + Clone + Send + Sync {
    move |attempt| {
        increment
            .checked_mul(attempt)
            .and_then(|step| base.checked_add(step))
            .map_or(max, |delay| delay.min(max))
    }
}

/// `base * multiplier^attempt`, capped at `max`.
pub fn exponential(
    base: Duration,
    multiplier: f64,
    max: Duration,
) -> impl Fn(u32) -> Duration + Clone + Send + Sync {
    move |attempt| {
        if attempt == 0 {
            return base.min(max);
        }
        let factor = multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        scale(base, factor, max)
    }
}

/// `delay * factor`, clamped to `max`. Non-finite or negative growth
/// saturates to `max` or zero respectively.
pub(crate) fn scale(delay: Duration, factor: f64, max: Duration) -> Duration {
    let nanos = delay.as_nanos() as f64 * factor;
    if nanos.is_nan() || nanos >= max.as_nanos() as f64 {
        return max;
    }
    if nanos <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(nanos.round() as u64).min(max)
}
