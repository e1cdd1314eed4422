//! Authorization helpers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::request::Request;

/// Pluggable authentication applied to a request builder.
pub trait AuthProvider {
    fn apply(&self, request: Request) -> Request;
}

impl<F> AuthProvider for F
where
    F: Fn(Request) -> Request,
{
    fn apply(&self, request: Request) -> Request {
        self(request)
    }
}

impl Request {
    /// Set `Authorization: <kind> <credentials>`.
    pub fn auth(self, kind: &str, credentials: &str) -> Self {
        self.headers([("Authorization", format!("{kind} {credentials}"))])
    }

    pub fn basic_auth(self, username: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        self.auth("Basic", &encoded)
    }

    pub fn bearer_token(self, token: &str) -> Self {
        self.auth("Bearer", token)
    }

    /// Delegate to `provider`; skipped on a poisoned request.
    pub fn with_auth<P>(self, provider: &P) -> Self
    where
        P: AuthProvider + ?Sized,
    {
        if self.is_poisoned() {
            return self;
        }
        provider.apply(self)
    }
}
