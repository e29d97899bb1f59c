//! Upstream target validation.
//!
//! # Responsibilities
//! - Parse the configured origin once, at proxy construction
//! - Reject anything that is not `http` or `https`
//! - Expose scheme, host, port and base path for URL building
//! - Expose the raw network location for Location rewriting

use std::fmt;

use axum::http::Uri;

use crate::proxy::error::ProxyError;

/// Upstream scheme. Nothing else can be forwarded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamScheme {
    Http,
    Https,
}

impl UpstreamScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamScheme::Http => "http",
            UpstreamScheme::Https => "https",
        }
    }
}

impl fmt::Display for UpstreamScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The validated destination origin of a proxy instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    origin: String,
    scheme: UpstreamScheme,
    netloc: String,
    host: String,
    port: Option<u16>,
    base_path: String,
}

impl UpstreamTarget {
    /// Parse and validate an origin such as `http://example.com/area`.
    pub fn parse(origin: &str) -> Result<Self, ProxyError> {
        let invalid = || ProxyError::InvalidUpstream(origin.to_string());

        let uri: Uri = origin.parse().map_err(|_| invalid())?;
        let scheme = match uri.scheme_str() {
            Some("http") => UpstreamScheme::Http,
            Some("https") => UpstreamScheme::Https,
            _ => return Err(invalid()),
        };
        let authority = uri.authority().ok_or_else(invalid)?;
        if authority.host().is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            origin: origin.to_string(),
            scheme,
            netloc: authority.as_str().to_string(),
            host: authority.host().to_string(),
            port: authority.port_u16(),
            base_path: uri.path().to_string(),
        })
    }

    /// The origin exactly as configured; the URL builder appends to it verbatim.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn scheme(&self) -> UpstreamScheme {
        self.scheme
    }

    /// Host and port as written in the origin (e.g., `backend:8000`).
    pub fn netloc(&self) -> &str {
        &self.netloc
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.origin)
    }
}
