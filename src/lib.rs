//! Fluent HTTP request layer.
//!
//! ```text
//!   Client ──▶ Request builder ──▶ middleware ──▶ send / send_with_retry
//!                                                      │
//!                          ┌───────────────────────────┘
//!                          ▼
//!                   retry engine (resilience)
//!                          │ one attempt at a time
//!                          ▼
//!        transport stack: interceptors ─▶ dump ─▶ hyper / reqwest
//!                          │
//!                          ▼
//!                Response (buffered) ──▶ validators
//! ```
//!
//! ```no_run
//! use rq_client::{validation, Client, RetryPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), rq_client::Error> {
//! let client = Client::new();
//! let res = client
//!     .get("http://localhost:8080/health")
//!     .header("Accept", "application/json")
//!     .validate([validation::ok()])
//!     .send_with_retry(&CancellationToken::new(), &RetryPolicy::default())
//!     .await;
//! let body: serde_json::Value = res.json()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod request;
pub mod resilience;
pub mod response;
pub mod transport;
pub mod validation;

pub use client::Client;
pub use error::{BoxError, Error, Result};
pub use middleware::{Chain, Middleware};
pub use request::{AuthProvider, Request};
pub use resilience::{backoff, RetryPolicy};
pub use response::Response;
pub use transport::{Transport, WireRequest, WireResponse};
pub use validation::{BoxedValidator, Validator};
