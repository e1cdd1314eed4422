//! Request building and single-attempt execution.
//!
//! # Data Flow
//! ```text
//! Client::get(url)
//!     → builder steps (method, headers, query, body, auth, middleware)
//!     → first failing step poisons the request; later steps are no-ops
//!     → send / send_with_retry
//!     → attempt: wire request built from buffered state
//!     → transport exchange raced against timeout and cancellation
//!     → body buffered into Response
//! ```
//!
//! # Design Decisions
//! - Every builder step goes through `update`, so the first error wins
//! - A poisoned request never reaches the transport
//! - Each attempt constructs its own wire request; the builder is not mutated

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{HeaderMap, Method};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::Client;
use crate::error::Error;
use crate::middleware::Middleware;
use crate::observability::metrics;
use crate::resilience::{self, RetryPolicy};
use crate::response::Response;
use crate::transport::{Transport, WireRequest};
use crate::validation::Validator;

pub mod auth;
pub mod body;

pub use auth::AuthProvider;
pub use body::BodySource;

/// Request descriptor assembled through a fluent builder.
pub struct Request {
    client: Client,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<BodySource>,
    timeout: Option<Duration>,
    validators: Vec<Box<dyn Validator>>,
    error: Option<Error>,
}

impl Request {
    /// Empty GET request executed through `client`.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            method: Method::GET,
            url: String::new(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
            validators: Vec::new(),
            error: None,
        }
    }

    /// Apply `step` unless the request is already poisoned; an error poisons it.
    pub(crate) fn update<F>(mut self, step: F) -> Self
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        if self.error.is_none() {
            if let Err(e) = step(&mut self) {
                tracing::debug!(error = %e, "Request builder poisoned");
                self.error = Some(e);
            }
        }
        self
    }

    /// Set the HTTP method.
    pub fn method(self, method: impl AsRef<str>) -> Self {
        self.update(|r| {
            r.method = Method::from_bytes(method.as_ref().as_bytes())
                .map_err(|e| Error::Builder(format!("invalid method {:?}: {e}", method.as_ref())))?;
            Ok(())
        })
    }

    /// Set the target URL. Parsing is deferred to execution.
    pub fn url(self, url: impl Into<String>) -> Self {
        self.update(|r| {
            r.url = url.into();
            Ok(())
        })
    }

    /// Append a header value, keeping existing values for the same name.
    pub fn header(self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.update(|r| {
            let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
            r.headers.append(name, value);
            Ok(())
        })
    }

    /// Set several headers, replacing existing values.
    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.update(|r| {
            for (name, value) in headers {
                let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
                r.headers.insert(name, value);
            }
            Ok(())
        })
    }

    /// Append a query parameter.
    pub fn query_param(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.update(|r| {
            r.query.push((key.into(), value.into()));
            Ok(())
        })
    }

    /// Set several query parameters, replacing existing values per key.
    pub fn query_params<I, K, V>(self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.update(|r| {
            for (key, value) in params {
                let key = key.into();
                r.query.retain(|(k, _)| *k != key);
                r.query.push((key, value.into()));
            }
            Ok(())
        })
    }

    /// Override the per-attempt timeout; zero leaves the client default.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.update(|r| {
            if !timeout.is_zero() {
                r.timeout = Some(timeout);
            }
            Ok(())
        })
    }

    /// Execute through a different client.
    pub fn client(self, client: Client) -> Self {
        self.update(|r| {
            r.client = client;
            Ok(())
        })
    }

    /// Execute through a different transport, keeping the client defaults.
    pub fn transport<T: Transport>(self, transport: T) -> Self {
        self.update(|r| {
            r.client = r.client.clone().map_transport(|_| Arc::new(transport) as Arc<dyn Transport>);
            Ok(())
        })
    }

    /// Register validators run on the final response.
    pub fn validate<I>(self, validators: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Validator>>,
    {
        self.update(|r| {
            r.validators.extend(validators);
            Ok(())
        })
    }

    /// Poison the request with `err` unless it already carries an error.
    pub fn poison(self, err: Error) -> Self {
        self.update(|_| Err(err))
    }

    /// Apply a middleware.
    pub fn with<M>(self, middleware: &M) -> Self
    where
        M: Middleware + ?Sized,
    {
        middleware.apply(self)
    }

    pub fn method_ref(&self) -> &Method {
        &self.method
    }

    pub fn url_ref(&self) -> &str {
        &self.url
    }

    pub fn headers_ref(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query_ref(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn timeout_ref(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn client_ref(&self) -> &Client {
        &self.client
    }

    /// The stored builder error, if the request is poisoned.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn is_poisoned(&self) -> bool {
        self.error.is_some()
    }

    /// Execute exactly one attempt. A streaming body is sent without buffering.
    pub async fn send(mut self, cancel: &CancellationToken) -> Response {
        if let Some(err) = self.take_error() {
            return Response::from_error(err);
        }

        let body = self.body.take().map_or_else(Body::empty, BodySource::into_body);
        let method = self.method.to_string();
        let started = Instant::now();

        let mut response = self.attempt(body, cancel).await;
        response.set_attempts(1);
        metrics::record_attempt(self.client.metrics_enabled(), &method, &response, started);

        self.run_validators(&mut response);
        response
    }

    /// Execute with retries governed by `policy`.
    pub async fn send_with_retry(self, cancel: &CancellationToken, policy: &RetryPolicy) -> Response {
        resilience::execute_with_retry(self, cancel, policy).await
    }

    /// Execute with the retry policy of the request's client.
    pub async fn send_with_default_retry(self, cancel: &CancellationToken) -> Response {
        let policy = self.client.retry_policy().clone();
        resilience::execute_with_retry(self, cancel, &policy).await
    }

    pub(crate) fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Read the body source fully into memory for replay.
    pub(crate) async fn buffer_body(&mut self) -> Result<Option<axum::body::Bytes>, Error> {
        match self.body.take() {
            Some(source) => source.into_bytes().await.map(Some),
            None => Ok(None),
        }
    }

    /// One exchange. The returned future owns everything it needs.
    pub(crate) fn attempt(
        &self,
        body: Body,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Response> + Send + 'static {
        let prepared = self.prepare(body);
        let transport = self.client.transport();
        let timeout = self.timeout.or(self.client.default_timeout());
        let cancel = cancel.clone();

        async move {
            match prepared {
                Ok(wire) => exchange(transport, wire, timeout, cancel).await,
                Err(err) => Response::from_error(err),
            }
        }
    }

    /// Build the wire request from the current state.
    fn prepare(&self, body: Body) -> Result<WireRequest, Error> {
        let mut url = Url::parse(&self.url).map_err(|e| Error::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        if !self.query.is_empty() {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let mut builder = axum::http::Request::builder()
            .method(self.method.clone())
            .uri(url.as_str());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
        }
        builder
            .body(body)
            .map_err(|e| Error::Construction(e.to_string()))
    }

    pub(crate) fn run_validators(&self, response: &mut Response) {
        if response.error().is_some() {
            return;
        }
        for validator in &self.validators {
            if let Err(err) = validator.validate(response) {
                response.set_error(err);
                return;
            }
        }
    }
}

/// Run the transport exchange, racing cancellation and the timeout, and
/// buffer the response body.
async fn exchange(
    transport: Arc<dyn Transport>,
    request: WireRequest,
    timeout: Option<Duration>,
    cancel: CancellationToken,
) -> Response {
    let exchange = async {
        let response = transport.execute(request, &cancel).await?;
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| Error::Body(e.to_string()));
        Ok::<_, Error>((parts, body))
    };

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = with_timeout(timeout, exchange) => result,
    };

    match outcome {
        Ok((parts, Ok(body))) => Response::from_parts(parts, body),
        Ok((parts, Err(err))) => {
            let mut response = Response::from_parts(parts, Default::default());
            response.set_error(err);
            response
        }
        Err(err) => Response::from_error(err),
    }
}

async fn with_timeout<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(limit)),
        },
        None => fut.await,
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::Builder(format!("invalid header name {name:?}: {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| Error::Builder(format!("invalid value for header {name}: {e}")))?;
    Ok((name, value))
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .field("timeout", &self.timeout)
            .field("validators", &self.validators.len())
            .field("error", &self.error)
            .finish()
    }
}
