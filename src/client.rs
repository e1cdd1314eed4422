//! Explicitly constructed execution client.
//!
//! A `Client` bundles the transport and per-request defaults. There is no
//! process-wide instance: callers build one (directly or from
//! [`ClientConfig`]) and every [`Request`] carries a cheap clone of it.

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;

use crate::config::{ClientConfig, TransportKind};
use crate::error::Error;
use crate::request::Request;
use crate::resilience::RetryPolicy;
use crate::transport::{HyperTransport, ProxyConfig, ReqwestTransport, Transport};

/// Default end-to-end timeout for a single attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport plus request defaults, shared by the requests it creates.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    retry_policy: RetryPolicy,
    metrics_enabled: bool,
}

impl Client {
    /// Client using the hyper transport and a 30 second timeout.
    pub fn new() -> Self {
        Self::with_transport(HyperTransport::default())
    }

    /// Client using `transport`.
    pub fn with_transport<T: Transport>(transport: T) -> Self {
        Self::from_shared_transport(Arc::new(transport))
    }

    /// Client using an already shared transport.
    pub fn from_shared_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: Some(DEFAULT_TIMEOUT),
            user_agent: None,
            retry_policy: RetryPolicy::default(),
            metrics_enabled: true,
        }
    }

    /// Build a client from validated configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        let connect_timeout = Some(Duration::from_secs(config.timeouts.connect_secs))
            .filter(|d| !d.is_zero());

        let proxy = config
            .proxy
            .as_deref()
            .map(ProxyConfig::from_url)
            .transpose()?;

        let transport: Arc<dyn Transport> = match (config.transport, proxy) {
            (_, Some(proxy)) => Arc::new(ReqwestTransport::with_proxy(&proxy, connect_timeout)?),
            (TransportKind::Reqwest, None) => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                let client = builder
                    .build()
                    .map_err(|e| Error::Builder(format!("failed to build reqwest client: {e}")))?;
                Arc::new(ReqwestTransport::new(client))
            }
            (TransportKind::Hyper, None) => Arc::new(HyperTransport::with_connect_timeout(connect_timeout)),
        };

        tracing::debug!(
            transport = ?config.transport,
            proxy = config.proxy.is_some(),
            request_timeout_secs = config.timeouts.request_secs,
            "Client configured"
        );

        Ok(Self {
            transport,
            timeout: Some(Duration::from_secs(config.timeouts.request_secs)).filter(|d| !d.is_zero()),
            user_agent: config.user_agent.clone(),
            retry_policy: RetryPolicy::from(&config.retries),
            metrics_enabled: config.observability.metrics_enabled,
        })
    }

    /// Set the default per-attempt timeout; `None` disables it.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `User-Agent` applied to every new request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the policy returned by [`Client::retry_policy`].
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Turn attempt and retry metrics on or off for requests of this client.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Replace the transport, keeping every other setting.
    pub fn map_transport<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Arc<dyn Transport>) -> Arc<dyn Transport>,
    {
        self.transport = f(self.transport);
        self
    }

    /// The shared transport.
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    /// Default per-attempt timeout.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Retry policy configured for this client.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }

    /// Start a request with an explicit method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> Request {
        let mut request = Request::new(self.clone()).method(method).url(url);
        if let Some(ua) = &self.user_agent {
            request = request.header("User-Agent", ua);
        }
        request
    }

    pub fn get(&self, url: impl Into<String>) -> Request {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: impl Into<String>) -> Request {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: impl Into<String>) -> Request {
        self.request(Method::PUT, url)
    }

    pub fn delete(&self, url: impl Into<String>) -> Request {
        self.request(Method::DELETE, url)
    }

    pub fn patch(&self, url: impl Into<String>) -> Request {
        self.request(Method::PATCH, url)
    }

    pub fn head(&self, url: impl Into<String>) -> Request {
        self.request(Method::HEAD, url)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("retry_policy", &self.retry_policy)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish_non_exhaustive()
    }
}
