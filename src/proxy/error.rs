//! Error types for the forwarding pipeline.

use thiserror::Error;

/// Errors raised by a proxy instance.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The upstream origin is not an http/https URL.
    #[error("Upstream URL scheme must be either 'http' or 'https' ({0})")]
    InvalidUpstream(String),

    /// A rewrite pattern failed to compile.
    #[error("Invalid rewrite pattern '{pattern}': {source}")]
    InvalidRewrite {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The fallback content type is not a valid header value.
    #[error("Invalid default content type '{0}'")]
    InvalidContentType(String),

    /// The upstream call itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Transport-level failures talking to the upstream.
///
/// Upstream 4xx/5xx responses are not errors; they are relayed as-is.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Could not establish a connection.
    #[error("Upstream connection failed: {0}")]
    Connect(#[source] BoxError),

    /// No response head within the configured deadline.
    #[error("Upstream timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The upstream sent something that is not valid HTTP, or dropped the connection.
    #[error("Upstream protocol error: {0}")]
    Protocol(#[source] BoxError),

    /// The built upstream URL or headers could not form a request.
    #[error("Invalid upstream request: {0}")]
    InvalidRequest(#[source] axum::http::Error),
}

/// Boxed source error from the underlying client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

impl TransportError {
    /// Whether the request never reached the upstream.
    pub fn is_connect(&self) -> bool {
        matches!(self, TransportError::Connect(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}
