//! Request body sources and the body builder steps.

use std::pin::Pin;

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;

use crate::error::Error;
use crate::request::Request;

/// Where the request body comes from.
pub enum BodySource {
    /// Fully in-memory payload.
    Bytes(Bytes),
    /// Streaming payload, read at most once.
    Reader(Pin<Box<dyn AsyncRead + Send>>),
}

impl BodySource {
    /// Read the whole source into memory.
    pub(crate) async fn into_bytes(self) -> Result<Bytes, Error> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader
                    .read_to_end(&mut buf)
                    .await
                    .map_err(|e| Error::Body(format!("failed to read request body: {e}")))?;
                Ok(Bytes::from(buf))
            }
        }
    }

    /// Convert into a wire body; readers are streamed without buffering.
    pub(crate) fn into_body(self) -> Body {
        match self {
            Self::Bytes(bytes) => Body::from(bytes),
            Self::Reader(reader) => Body::from_stream(ReaderStream::new(reader)),
        }
    }
}

impl std::fmt::Debug for BodySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Reader(_) => f.write_str("Reader"),
        }
    }
}

impl Request {
    /// Stream the body from `reader`. Retries buffer it once before the first attempt.
    pub fn body_reader<R>(self, reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        self.update(|r| {
            r.body = Some(BodySource::Reader(Box::pin(reader)));
            Ok(())
        })
    }

    pub fn body_bytes(self, body: impl Into<Bytes>) -> Self {
        self.update(|r| {
            r.body = Some(BodySource::Bytes(body.into()));
            Ok(())
        })
    }

    pub fn body_string(self, body: impl Into<String>) -> Self {
        self.update(|r| {
            r.body = Some(BodySource::Bytes(Bytes::from(body.into())));
            Ok(())
        })
    }

    /// Serialize `value` as JSON and set `Content-Type: application/json`.
    pub fn body_json<T>(self, value: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        self.update(|r| {
            let data = serde_json::to_vec(value)
                .map_err(|e| Error::Builder(format!("failed to marshal JSON: {e}")))?;
            r.body = Some(BodySource::Bytes(Bytes::from(data)));
            r.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Ok(())
        })
    }

    /// URL-encode `fields` and set `Content-Type: application/x-www-form-urlencoded`.
    pub fn body_form<I, K, V>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.update(|r| {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields)
                .finish();
            r.body = Some(BodySource::Bytes(Bytes::from(encoded)));
            r.headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;

    async fn body_of(request: &mut Request) -> String {
        let bytes = request.buffer_body().await.unwrap().unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_body_string_and_bytes() {
        let mut req = Client::new().post("http://localhost/").body_string("hello");
        assert_eq!(body_of(&mut req).await, "hello");

        let mut req = Client::new()
            .post("http://localhost/")
            .body_bytes(vec![b'h', b'i']);
        assert_eq!(body_of(&mut req).await, "hi");
    }

    #[tokio::test]
    async fn test_body_json_sets_content_type() {
        let mut req = Client::new()
            .post("http://localhost/")
            .body_json(&serde_json::json!({ "name": "rq" }));

        assert_eq!(req.headers_ref()[CONTENT_TYPE], "application/json");
        assert_eq!(body_of(&mut req).await, r#"{"name":"rq"}"#);
    }

    #[tokio::test]
    async fn test_body_form_encoding() {
        let mut req = Client::new()
            .post("http://localhost/")
            .body_form([("user", "a b"), ("lang", "rust&go")]);

        assert_eq!(
            req.headers_ref()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(body_of(&mut req).await, "user=a+b&lang=rust%26go");
    }

    #[tokio::test]
    async fn test_body_reader_buffered() {
        let mut req = Client::new()
            .post("http://localhost/")
            .body_reader(std::io::Cursor::new(b"from reader".to_vec()));
        assert_eq!(body_of(&mut req).await, "from reader");
        assert!(req.buffer_body().await.unwrap().is_none());
    }
}
