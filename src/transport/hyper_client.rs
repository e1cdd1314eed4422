//! Default transport backed by hyper-util's pooled legacy client.
//!
//! Plain HTTP/1.1 and HTTP/2 (prior knowledge) only; use
//! [`ReqwestTransport`](super::ReqwestTransport) for TLS or proxies.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio_util::sync::CancellationToken;

use super::{Transport, WireRequest, WireResponse};
use crate::error::Error;

/// Transport using a shared hyper-util client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
}

impl HyperTransport {
    /// Create a transport with default connector settings.
    pub fn new() -> Self {
        Self::with_connect_timeout(None)
    }

    /// Create a transport whose connector gives up after `timeout`.
    pub fn with_connect_timeout(timeout: Option<Duration>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(timeout);
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn execute(
        &self,
        request: WireRequest,
        _cancel: &CancellationToken,
    ) -> Result<WireResponse, Error> {
        let uri = request.uri().clone();
        match self.client.request(request).await {
            Ok(response) => {
                let (parts, body): (_, Incoming) = response.into_parts();
                Ok(WireResponse::from_parts(parts, Body::new(body)))
            }
            Err(e) => {
                tracing::debug!(uri = %uri, error = %e, "Transport error");
                Err(Error::transport(e))
            }
        }
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_response_body_streams_through() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 201 Created\r\nContent-Length: 5\r\nX-Backend: raw\r\n\r\nhello")
                .await
                .unwrap();
        });

        let req = axum::http::Request::builder()
            .uri(format!("http://{}/", addr))
            .body(Body::empty())
            .unwrap();
        let res = HyperTransport::new()
            .execute(req, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(res.status(), 201);
        assert_eq!(res.headers()["x-backend"], "raw");
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HyperTransport::with_connect_timeout(Some(Duration::from_secs(1)));
        let req = axum::http::Request::builder()
            .uri(format!("http://{}/", addr))
            .body(Body::empty())
            .unwrap();

        let err = transport
            .execute(req, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
