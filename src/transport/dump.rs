//! Diagnostic transport dumping full requests and responses.
//!
//! Both bodies are buffered, written to the sink, and restored so that the
//! real transport and the caller each still read them exactly once.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Version};
use tokio_util::sync::CancellationToken;

use super::{HyperTransport, Transport, WireRequest, WireResponse};
use crate::error::Error;

/// Destination for dumped text.
pub type DumpSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Transport decorator logging every exchange in wire-like form.
#[derive(Clone)]
pub struct DumpTransport {
    base: Arc<dyn Transport>,
    sink: DumpSink,
}

impl DumpTransport {
    /// Dump exchanges through `base` to the tracing log.
    pub fn new(base: Arc<dyn Transport>) -> Self {
        Self {
            base,
            sink: Arc::new(|text: &str| tracing::info!(target: "rq_client::dump", "{}", text)),
        }
    }

    /// Replace the default tracing sink.
    pub fn with_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.sink = Arc::new(sink);
        self
    }
}

impl Default for DumpTransport {
    fn default() -> Self {
        Self::new(Arc::new(HyperTransport::default()))
    }
}

#[async_trait]
impl Transport for DumpTransport {
    async fn execute(
        &self,
        request: WireRequest,
        cancel: &CancellationToken,
    ) -> Result<WireResponse, Error> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| Error::Body(format!("read request body: {e}")))?;

        let mut head = format!(
            "{} {} {}\r\n",
            parts.method,
            parts.uri.path_and_query().map(|p| p.as_str()).unwrap_or("/"),
            version_str(parts.version)
        );
        if let Some(host) = parts.uri.authority() {
            let _ = write!(head, "Host: {}\r\n", host);
        }
        write_headers(&mut head, &parts.headers);
        let request_dump = frame("HTTP REQUEST", &head, &body);

        let request = WireRequest::from_parts(parts, Body::from(body));
        let result = self.base.execute(request, cancel).await;

        // The request is dumped whether or not the exchange succeeded.
        (self.sink)(&request_dump);

        let response = result?;
        let (parts, body) = response.into_parts();
        let body = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                (self.sink)(&format!("Failed to dump response: {e}"));
                return Err(Error::Body(e.to_string()));
            }
        };

        let mut head = format!("{} {}\r\n", version_str(parts.version), parts.status);
        write_headers(&mut head, &parts.headers);
        (self.sink)(&frame("HTTP RESPONSE", &head, &body));

        Ok(WireResponse::from_parts(parts, Body::from(body)))
    }
}

impl std::fmt::Debug for DumpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpTransport").finish_non_exhaustive()
    }
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let _ = write!(out, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()));
    }
}

fn frame(title: &str, head: &str, body: &Bytes) -> String {
    let rule = "=".repeat(title.len() + 8);
    format!(
        "=== {} ===\n{}\r\n{}\n{}",
        title,
        head,
        String::from_utf8_lossy(body),
        rule
    )
}
