//! Buffered response envelope.
//!
//! The body is read fully before the envelope is handed out, so every
//! accessor is synchronous except [`Response::save_to_file`].

use std::io::Cursor;
use std::path::Path;

use axum::body::Bytes;
use axum::http::{response::Parts, HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::Error;

/// Outcome of an execution: status, headers, buffered body, optional error.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Bytes,
    error: Option<Error>,
    attempts: u32,
}

impl Response {
    /// Envelope for an exchange that failed before any status arrived.
    pub fn from_error(error: Error) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Envelope carrying only a status. Codes outside 100..=999 leave it absent.
    pub fn from_status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).ok(),
            ..Self::default()
        }
    }

    pub(crate) fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            status: Some(parts.status),
            headers: parts.headers,
            body,
            error: None,
            attempts: 0,
        }
    }

    /// Attach a body to a hand-built envelope.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach a header to a hand-built envelope; invalid input is ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            axum::http::HeaderName::from_bytes(name.as_bytes()),
            axum::http::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub(crate) fn set_attempts(&mut self, attempts: u32) {
        self.attempts = attempts;
    }

    pub(crate) fn set_error(&mut self, error: Error) {
        self.error = Some(error);
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Numeric status, or 0 when no response arrived.
    pub fn status_code(&self) -> u16 {
        self.status.map_or(0, |s| s.as_u16())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of header `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Number of attempts that produced this response.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// No error and a 2xx status.
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.status.is_some_and(|s| s.is_success())
    }

    /// An error, no status, or a status of 400 and above.
    pub fn is_error(&self) -> bool {
        match (&self.error, self.status) {
            (Some(_), _) | (None, None) => true,
            (None, Some(s)) => s.as_u16() >= 400,
        }
    }

    /// Fail unless the status equals `expected`.
    pub fn expect_status(&self, expected: u16) -> Result<(), Error> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.status_code() != expected {
            return Err(Error::Validation(format!(
                "expected status {expected}, got {}",
                self.status_code()
            )));
        }
        Ok(())
    }

    /// Fail unless the status is 2xx.
    pub fn expect_ok(&self) -> Result<(), Error> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if !self.is_ok() {
            return Err(Error::Validation(format!(
                "expected 2xx status, got {}",
                self.status_code()
            )));
        }
        Ok(())
    }

    pub fn bytes(&self) -> Result<Bytes, Error> {
        self.checked().map(|_| self.body.clone())
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String, Error> {
        self.checked()?;
        String::from_utf8(self.body.to_vec())
            .map_err(|e| Error::Decode(format!("response body is not valid UTF-8: {e}")))
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        self.checked()?;
        serde_json::from_slice(&self.body).map_err(|e| Error::Decode(format!("decode JSON: {e}")))
    }

    /// Decode the body as JSON, panicking on any failure.
    ///
    /// Only meant for tests and scripts where failing fast is wanted.
    pub fn must_json<T: DeserializeOwned>(&self) -> T {
        match self.json() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Reader over the buffered body.
    pub fn body_reader(&self) -> Result<Cursor<Bytes>, Error> {
        self.bytes().map(Cursor::new)
    }

    /// Write the body to `path`, owner read/write only on unix.
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.checked()?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path.as_ref()).await?;
        tokio::io::AsyncWriteExt::write_all(&mut file, &self.body).await?;
        tokio::io::AsyncWriteExt::flush(&mut file).await?;

        tracing::debug!(path = %path.as_ref().display(), bytes = self.body.len(), "Response saved");
        Ok(())
    }

    /// The response itself, or its stored error.
    pub fn into_result(self) -> Result<Self, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    fn checked(&self) -> Result<(), Error> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_classification() {
        let ok = Response::from_status(204);
        assert!(ok.is_ok());
        assert!(!ok.is_error());

        let not_found = Response::from_status(404);
        assert!(!not_found.is_ok());
        assert!(not_found.is_error());

        let redirect = Response::from_status(302);
        assert!(!redirect.is_ok());
        assert!(!redirect.is_error());

        let nonstandard = Response::from_status(600);
        assert_eq!(nonstandard.status_code(), 600);
        assert!(!nonstandard.is_ok());
        assert!(nonstandard.is_error());

        let failed = Response::from_error(Error::Timeout(Duration::from_secs(1)));
        assert!(failed.is_error());
        assert_eq!(failed.status_code(), 0);
        assert!(failed.status().is_none());
    }

    #[test]
    fn test_accessors_surface_error() {
        let res = Response::from_error(Error::Cancelled).with_body("ignored");
        assert!(matches!(res.bytes(), Err(Error::Cancelled)));
        assert!(matches!(res.text(), Err(Error::Cancelled)));
        assert!(matches!(res.json::<serde_json::Value>(), Err(Error::Cancelled)));
        assert!(matches!(res.expect_ok(), Err(Error::Cancelled)));
        assert!(res.into_result().is_err());
    }

    #[test]
    fn test_expect_status() {
        let res = Response::from_status(201);
        assert!(res.expect_status(201).is_ok());
        assert_eq!(
            res.expect_status(200).unwrap_err().to_string(),
            "expected status 200, got 201"
        );
        assert!(res.expect_ok().is_ok());
    }

    #[test]
    fn test_text_rejects_invalid_utf8() {
        let res = Response::from_status(200).with_body(vec![0xff, 0xfe]);
        assert!(matches!(res.text(), Err(Error::Decode(_))));
    }

    #[test]
    fn test_json_decoding() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Item {
            id: u32,
        }

        let res = Response::from_status(200).with_body(r#"{"id":7}"#);
        assert_eq!(res.json::<Item>().unwrap(), Item { id: 7 });
        assert_eq!(res.must_json::<Item>(), Item { id: 7 });

        let bad = Response::from_status(200).with_body("nope");
        assert!(matches!(bad.json::<Item>(), Err(Error::Decode(_))));
    }

    #[test]
    #[should_panic(expected = "decode JSON")]
    fn test_must_json_panics() {
        let res = Response::from_status(200).with_body("{");
        let _: serde_json::Value = res.must_json();
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let res = Response::from_status(200).with_header("Content-Type", "text/plain");
        assert_eq!(res.header("content-type"), Some("text/plain"));
        assert_eq!(res.header("x-missing"), None);
    }

    #[test]
    fn test_body_reader() {
        use std::io::Read;

        let res = Response::from_status(200).with_body("stream me");
        let mut out = String::new();
        res.body_reader().unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "stream me");
    }

    #[tokio::test]
    async fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.txt");

        Response::from_status(200)
            .with_body("saved")
            .save_to_file(&path)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "saved");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
