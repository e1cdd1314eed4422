//! Transport backed by reqwest, for TLS endpoints and proxies.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use tokio_util::sync::CancellationToken;

use super::{ProxyConfig, Transport, WireRequest, WireResponse};
use crate::error::Error;

/// Transport delegating to a [`reqwest::Client`].
///
/// Request bodies are buffered before handing them to reqwest, and response
/// bodies are read in full before returning.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wrap an existing reqwest client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client routed through `proxy`.
    pub fn with_proxy(proxy: &ProxyConfig, connect_timeout: Option<Duration>) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder().proxy(proxy.to_reqwest()?);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Builder(format!("failed to build reqwest client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: WireRequest,
        _cancel: &CancellationToken,
    ) -> Result<WireResponse, Error> {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| Error::Body(e.to_string()))?;

        let request = reqwest::Request::try_from(axum::http::Request::from_parts(parts, bytes))
            .map_err(|e| Error::Construction(e.to_string()))?;

        let response = self.client.execute(request).await.map_err(Error::transport)?;

        let mut builder = axum::http::Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().clone());
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Body(e.to_string()))?;

        builder
            .body(Body::from(bytes))
            .map_err(|e| Error::Construction(e.to_string()))
    }
}
