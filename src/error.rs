//! Error taxonomy for request execution.
//!
//! Every failure is carried as a value on the [`Response`](crate::Response)
//! rather than returned across the execution boundary, so the error type is
//! cheap to clone: sources are kept behind `Arc` or flattened to strings.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by transports and interceptor hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while building, executing or inspecting a request.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed configuration captured by the builder; poisons the request.
    #[error("builder error: {0}")]
    Builder(String),

    /// The target URL could not be parsed.
    #[error("invalid URL: {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The wire request could not be formed.
    #[error("failed to create request: {0}")]
    Construction(String),

    /// The exchange failed at the network layer.
    #[error("request failed: {0}")]
    Transport(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// The attempt exceeded its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The execution context was cancelled.
    #[error("request cancelled")]
    Cancelled,

    /// A request or response interceptor rejected the exchange.
    #[error("interceptor failed: {0}")]
    Interceptor(String),

    /// A request or response body could not be fully read.
    #[error("failed to read body: {0}")]
    Body(String),

    /// The response body could not be decoded.
    #[error("decode: {0}")]
    Decode(String),

    /// The response failed a validator.
    #[error("{0}")]
    Validation(String),

    /// Filesystem error while persisting a response.
    #[error("io error: {0}")]
    Io(#[source] Arc<std::io::Error>),
}

impl Error {
    /// Wrap a transport-level failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Transport(Arc::from(err.into()))
    }

    /// Returns true for network-level failures that a retry may cure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout(_))
    }

    /// Returns true if the execution context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

/// Result type for request operations.
pub type Result<T> = std::result::Result<T, Error>;
