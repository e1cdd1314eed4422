//! Interceptor pipeline around a transport.
//!
//! # Responsibilities
//! - Run the request hook before the exchange; a failure aborts it
//! - Delegate to the base transport (hyper by default)
//! - Run the response hook on success; a failure releases the body
//!
//! Hooks may mutate headers in place. Reading a body inside a hook is not
//! supported; use [`DumpTransport`](super::DumpTransport) for that.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{HyperTransport, Transport, WireRequest, WireResponse};
use crate::error::{BoxError, Error};

/// Hook invoked with the outgoing wire request.
pub type RequestInterceptor =
    Arc<dyn Fn(&CancellationToken, &mut WireRequest) -> Result<(), BoxError> + Send + Sync>;

/// Hook invoked with the incoming wire response.
pub type ResponseInterceptor =
    Arc<dyn Fn(&CancellationToken, &mut WireResponse) -> Result<(), BoxError> + Send + Sync>;

/// Transport decorator running optional request and response hooks.
#[derive(Clone)]
pub struct InterceptorTransport {
    base: Arc<dyn Transport>,
    request_interceptor: Option<RequestInterceptor>,
    response_interceptor: Option<ResponseInterceptor>,
}

impl InterceptorTransport {
    /// Wrap `base`.
    pub fn new(base: Arc<dyn Transport>) -> Self {
        Self {
            base,
            request_interceptor: None,
            response_interceptor: None,
        }
    }

    /// Set the hook run before the request is sent.
    pub fn on_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CancellationToken, &mut WireRequest) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.request_interceptor = Some(Arc::new(hook));
        self
    }

    /// Set the hook run after a response arrives.
    pub fn on_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CancellationToken, &mut WireResponse) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.response_interceptor = Some(Arc::new(hook));
        self
    }
}

// One hyper client per interceptor, shared by its clones.
impl Default for InterceptorTransport {
    fn default() -> Self {
        Self::new(Arc::new(HyperTransport::default()))
    }
}

#[async_trait]
impl Transport for InterceptorTransport {
    async fn execute(
        &self,
        mut request: WireRequest,
        cancel: &CancellationToken,
    ) -> Result<WireResponse, Error> {
        if let Some(hook) = &self.request_interceptor {
            if let Err(e) = hook(cancel, &mut request) {
                tracing::debug!(error = %e, "Request interceptor rejected exchange");
                return Err(Error::Interceptor(e.to_string()));
            }
        }

        let mut response = self.base.execute(request, cancel).await?;

        if let Some(hook) = &self.response_interceptor {
            if let Err(e) = hook(cancel, &mut response) {
                tracing::debug!(error = %e, status = %response.status(), "Response interceptor rejected exchange");
                drop(response);
                return Err(Error::Interceptor(e.to_string()));
            }
        }

        Ok(response)
    }
}

impl std::fmt::Debug for InterceptorTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorTransport")
            .field("request_interceptor", &self.request_interceptor.is_some())
            .field("response_interceptor", &self.response_interceptor.is_some())
            .finish()
    }
}
