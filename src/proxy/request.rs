//! The inbound request as the forwarding pipeline sees it.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};

use crate::security::principal::Principal;

/// One inbound request, owned by the pipeline for the duration of a single call.
#[derive(Debug)]
pub struct ProxyRequest {
    /// HTTP method, forwarded unchanged.
    pub method: Method,
    /// Path to forward, relative to the mount point (e.g., `login`).
    pub path: String,
    /// Path and query string exactly as received (e.g., `/area/login?next=/`).
    pub full_path: String,
    /// Inbound headers; a name may repeat.
    pub headers: HeaderMap,
    /// Request body, streamed through untouched.
    pub body: Body,
    /// Whether the inbound connection was secure.
    pub secure: bool,
    /// Public host the client addressed, with port if any.
    pub host: String,
    /// Authenticated caller, when the host pipeline attached one.
    pub principal: Option<Principal>,
}

impl ProxyRequest {
    /// A bodiless request with no headers.
    pub fn new(method: Method, full_path: impl Into<String>) -> Self {
        let full_path = full_path.into();
        let path = full_path
            .split('?')
            .next()
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_string();

        Self {
            method,
            path,
            full_path,
            headers: HeaderMap::new(),
            body: Body::empty(),
            secure: false,
            host: "localhost".to_string(),
            principal: None,
        }
    }

    /// Override the forwarded path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// The received path without its query string.
    pub fn request_path(&self) -> &str {
        self.full_path.split('?').next().unwrap_or_default()
    }

    /// The received query string, if any (without the `?`).
    pub fn query(&self) -> Option<&str> {
        self.full_path.split_once('?').map(|(_, query)| query)
    }
}
