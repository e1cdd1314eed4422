//! Request-builder middleware.
//!
//! A middleware takes a [`Request`] and returns it, possibly changed. They
//! compose in registration order through [`Chain`] and run before
//! execution, so they see the builder, never the wire request.

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::USER_AGENT;
use uuid::Uuid;

use crate::request::Request;
use crate::transport::{DumpSink, DumpTransport, Transport};

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Transformation applied to a request builder.
pub trait Middleware: Send + Sync {
    fn apply(&self, request: Request) -> Request;
}

impl<F> Middleware for F
where
    F: Fn(Request) -> Request + Send + Sync,
{
    fn apply(&self, request: Request) -> Request {
        self(request)
    }
}

/// Ordered list of middleware applied as one.
#[derive(Default)]
pub struct Chain {
    middleware: Vec<Box<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `middleware`; it runs after everything already registered.
    pub fn push<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Box::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

impl Middleware for Chain {
    fn apply(&self, request: Request) -> Request {
        self.middleware
            .iter()
            .fold(request, |request, m| m.apply(request))
    }
}

/// Log method and URL before the request is sent.
pub fn logging() -> impl Middleware {
    |request: Request| {
        tracing::info!(
            method = %request.method_ref(),
            url = %request.url_ref(),
            "Sending request"
        );
        request
    }
}

/// Set the `User-Agent` header.
pub fn user_agent(user_agent: impl Into<String>) -> impl Middleware {
    let user_agent = user_agent.into();
    move |request: Request| request.headers([(USER_AGENT.as_str(), user_agent.as_str())])
}

/// Set the per-attempt timeout.
pub fn timeout(timeout: Duration) -> impl Middleware {
    move |request: Request| request.timeout(timeout)
}

/// Set several headers, replacing existing values.
pub fn headers<I, K, V>(headers: I) -> impl Middleware
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let headers: Vec<(String, String)> = headers
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    move |request: Request| request.headers(headers.iter().map(|(k, v)| (k, v)))
}

/// Tag the request with a fresh `X-Request-ID` unless one is already set.
pub fn request_id() -> impl Middleware {
    |request: Request| {
        if request.headers_ref().contains_key(REQUEST_ID_HEADER) {
            return request;
        }
        let id = Uuid::new_v4();
        tracing::debug!(request_id = %id, "Assigned request id");
        request.header(REQUEST_ID_HEADER, id.to_string())
    }
}

/// Dump every exchange of the request to the tracing log.
pub fn dump() -> impl Middleware {
    |request: Request| wrap_dump(request, None)
}

/// Dump every exchange of the request to `sink`.
pub fn dump_to<F>(sink: F) -> impl Middleware
where
    F: Fn(&str) + Send + Sync + 'static,
{
    let sink: DumpSink = Arc::new(sink);
    move |request: Request| wrap_dump(request, Some(sink.clone()))
}

fn wrap_dump(request: Request, sink: Option<DumpSink>) -> Request {
    if request.is_poisoned() {
        return request;
    }
    let client = request.client_ref().clone().map_transport(|base| {
        let dump = DumpTransport::new(base);
        let dump = match sink {
            Some(sink) => dump.with_sink(move |text: &str| sink(text)),
            None => dump,
        };
        Arc::new(dump) as Arc<dyn Transport>
    });
    request.client(client)
}
