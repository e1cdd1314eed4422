//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! Request::attempt (wire request built from buffered state)
//!     → interceptor.rs (request hook → base transport → response hook)
//!     → dump.rs (optional diagnostic dumping decorator)
//!     → hyper_client.rs / reqwest_client.rs (actual socket I/O)
//!     → wire response handed back for buffering
//! ```
//!
//! # Design Decisions
//! - A transport performs exactly one exchange; retries live above it
//! - Decorators own an `Arc<dyn Transport>` so they can be stacked freely
//! - Failures are reported as crate `Error`s and propagated untouched

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

pub mod dump;
pub mod hyper_client;
pub mod interceptor;
pub mod proxy;
pub mod reqwest_client;

pub use self::dump::{DumpSink, DumpTransport};
pub use self::hyper_client::HyperTransport;
pub use self::interceptor::{InterceptorTransport, RequestInterceptor, ResponseInterceptor};
pub use self::proxy::{ProxyConfig, ProxyKind};
pub use self::reqwest_client::ReqwestTransport;

/// Outgoing request as handed to a transport.
pub type WireRequest = axum::http::Request<Body>;

/// Incoming response as returned by a transport, body not yet buffered.
pub type WireResponse = axum::http::Response<Body>;

/// Executes a single request/response exchange.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and return the response head with an unread body.
    ///
    /// The cancellation token belongs to the calling execution; transports
    /// may observe it but the caller races it regardless.
    async fn execute(
        &self,
        request: WireRequest,
        cancel: &CancellationToken,
    ) -> Result<WireResponse, Error>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn execute(
        &self,
        request: WireRequest,
        cancel: &CancellationToken,
    ) -> Result<WireResponse, Error> {
        (**self).execute(request, cancel).await
    }
}

/// Adapter allowing an async closure to act as a [`Transport`].
pub struct TransportFn<F>(F);

/// Wrap a closure as a transport.
pub fn transport_fn<F, Fut>(f: F) -> TransportFn<F>
where
    F: Fn(WireRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<WireResponse, Error>> + Send + 'static,
{
    TransportFn(f)
}

#[async_trait]
impl<F, Fut> Transport for TransportFn<F>
where
    F: Fn(WireRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<WireResponse, Error>> + Send + 'static,
{
    async fn execute(
        &self,
        request: WireRequest,
        _cancel: &CancellationToken,
    ) -> Result<WireResponse, Error> {
        (self.0)(request).await
    }
}
