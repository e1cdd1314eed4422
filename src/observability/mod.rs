//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every attempt produces:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and a duration histogram)
//! ```
//!
//! # Design Decisions
//! - The library only emits events; installing a subscriber or a metrics
//!   recorder is the binary's job
//! - Metrics go through the `metrics` facade and are no-ops without a recorder
//! - Whether a request emits metrics is a setting of its `Client`

pub mod logging;
pub mod metrics;

use crate::config::ObservabilityConfig;

/// Install logging for `config.log_level`.
pub fn init(config: &ObservabilityConfig) {
    logging::init(&config.log_level);
}
