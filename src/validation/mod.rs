//! Response validators.
//!
//! Validators run once on the final response of an execution and turn an
//! unwanted outcome into an [`Error::Validation`]. Each built-in returns the
//! response's existing error unchanged before checking anything else.
//!
//! ```text
//! client.get(url)
//!     .validate([validation::ok(), validation::header_exists("etag")])
//! ```

use regex::bytes::Regex;

use crate::error::Error;
use crate::response::Response;

/// A check applied to a finished response.
pub trait Validator: Send + Sync {
    fn validate(&self, response: &Response) -> Result<(), Error>;
}

impl<F> Validator for F
where
    F: Fn(&Response) -> Result<(), Error> + Send + Sync,
{
    fn validate(&self, response: &Response) -> Result<(), Error> {
        self(response)
    }
}

pub type BoxedValidator = Box<dyn Validator>;

fn boxed<F>(f: F) -> BoxedValidator
where
    F: Fn(&Response) -> Result<(), Error> + Send + Sync + 'static,
{
    Box::new(f)
}

fn existing_error(response: &Response) -> Result<(), Error> {
    match response.error() {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

/// Status is 2xx.
pub fn ok() -> BoxedValidator {
    boxed(|res| {
        existing_error(res)?;
        if !res.is_ok() {
            return Err(Error::Validation(format!(
                "expected 2xx status, got {}",
                res.status_code()
            )));
        }
        Ok(())
    })
}

/// Status equals `expected`.
pub fn status_code(expected: u16) -> BoxedValidator {
    boxed(move |res| {
        existing_error(res)?;
        if res.status_code() != expected {
            return Err(Error::Validation(format!(
                "expected status {expected}, got {}",
                res.status_code()
            )));
        }
        Ok(())
    })
}

/// Header `name` has exactly `expected` as its first value.
pub fn header(name: impl Into<String>, expected: impl Into<String>) -> BoxedValidator {
    let name = name.into();
    let expected = expected.into();
    boxed(move |res| {
        existing_error(res)?;
        let actual = res.header(&name).unwrap_or_default();
        if actual != expected {
            return Err(Error::Validation(format!(
                "expected header {name:?} to be {expected:?}, got {actual:?}"
            )));
        }
        Ok(())
    })
}

/// Header `name` is present with a non-empty value.
pub fn header_exists(name: impl Into<String>) -> BoxedValidator {
    let name = name.into();
    boxed(move |res| {
        existing_error(res)?;
        if res.header(&name).unwrap_or_default().is_empty() {
            return Err(Error::Validation(format!("expected header {name:?} to exist")));
        }
        Ok(())
    })
}

/// Body contains `needle`.
pub fn body_contains(needle: impl Into<String>) -> BoxedValidator {
    let needle = needle.into();
    boxed(move |res| {
        existing_error(res)?;
        let body = res.bytes()?;
        if !String::from_utf8_lossy(&body).contains(needle.as_str()) {
            return Err(Error::Validation(format!(
                "response body does not contain {needle:?}"
            )));
        }
        Ok(())
    })
}

/// Body matches the regular expression `pattern`.
///
/// An invalid pattern fails every validation with a descriptive error.
pub fn body_matches(pattern: impl Into<String>) -> BoxedValidator {
    let pattern = pattern.into();
    let compiled = Regex::new(&pattern).map_err(|e| e.to_string());
    boxed(move |res| {
        existing_error(res)?;
        let regex = compiled.as_ref().map_err(|reason| {
            Error::Validation(format!("invalid regex pattern {pattern:?}: {reason}"))
        })?;
        if !regex.is_match(&res.bytes()?) {
            return Err(Error::Validation(format!(
                "response body does not match pattern {pattern:?}"
            )));
        }
        Ok(())
    })
}

/// Every validator passes. Stops at the first failure.
pub fn all<I>(validators: I) -> BoxedValidator
where
    I: IntoIterator<Item = BoxedValidator>,
{
    let validators: Vec<_> = validators.into_iter().collect();
    boxed(move |res| {
        for validator in &validators {
            validator.validate(res)?;
        }
        Ok(())
    })
}

/// At least one validator passes.
///
/// When all fail, a single validator's error is returned as-is; several
/// failures are aggregated as `all validators failed: [1] ... [2] ...`.
pub fn any<I>(validators: I) -> BoxedValidator
where
    I: IntoIterator<Item = BoxedValidator>,
{
    let validators: Vec<_> = validators.into_iter().collect();
    boxed(move |res| {
        let mut errors = Vec::with_capacity(validators.len());
        for validator in &validators {
            match validator.validate(res) {
                Ok(()) => return Ok(()),
                Err(err) => errors.push(err),
            }
        }

        if errors.len() == 1 {
            return Err(errors.remove(0));
        }

        let mut message = String::from("all validators failed:");
        for (i, err) in errors.iter().enumerate() {
            message.push_str(&format!(" [{}] {err}", i + 1));
        }
        Err(Error::Validation(message))
    })
}

/// Inverts `validator`: a pass becomes a failure and any failure passes.
pub fn not(validator: BoxedValidator) -> BoxedValidator {
    boxed(move |res| match validator.validate(res) {
        Ok(()) => Err(Error::Validation(
            "expected validation to fail but it passed".into(),
        )),
        Err(_) => Ok(()),
    })
}
