//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts ≥ 1, multiplier ≥ 1.0, delays ordered)
//! - Check the proxy URL parses to a supported scheme
//!
//! Returns all validation errors, not just the first.

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::transport::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("retries.max_attempts must be at least 1")]
    NoAttempts,

    #[error("retries.multiplier must be >= 1.0, got {0}")]
    Multiplier(f64),

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    DelayOrder { base: u64, max: u64 },

    #[error("invalid proxy {url:?}: {reason}")]
    Proxy { url: String, reason: String },

    #[error("unknown log level {0:?}")]
    LogLevel(String),
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate `config`, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::NoAttempts);
    }

    if !(config.retries.multiplier >= 1.0) {
        errors.push(ValidationError::Multiplier(config.retries.multiplier));
    }

    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }

    if let Some(url) = &config.proxy {
        if let Err(e) = ProxyConfig::from_url(url) {
            errors.push(ValidationError::Proxy {
                url: url.clone(),
                reason: e.to_string(),
            });
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
