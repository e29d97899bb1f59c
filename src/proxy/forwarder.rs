//! Request forwarding.
//!
//! # Responsibilities
//! - Define the transport capability the pipeline forwards through
//! - Issue exactly one logical upstream call per request
//! - Never follow upstream redirects
//! - Log transport failures where they happen, then hand them back unchanged
//!
//! # Design Decisions
//! - The request body is moved into the transport as a stream, never buffered
//! - The response body stays a lazily consumed stream
//! - Retries are the transport's job, driven by the [`RetryPolicy`] carried on the request

use std::future::Future;

use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode};

use crate::proxy::error::TransportError;
use crate::proxy::headers::OutboundHeaders;
use crate::resilience::retries::RetryPolicy;

/// Everything a transport needs to perform one upstream call.
#[derive(Debug)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: OutboundHeaders,
    pub body: Body,
    /// Always `false` from the forwarder; 3xx responses are relayed to the client.
    pub follow_redirects: bool,
    pub retries: RetryPolicy,
}

/// The upstream's answer, with its body still unread.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }
}

/// Capability to perform an HTTP call and return a streamed response.
pub trait Transport: Send + Sync + 'static {
    fn forward(
        &self,
        request: UpstreamRequest,
    ) -> impl Future<Output = Result<UpstreamResponse, TransportError>> + Send;
}

/// Owns the forwarding policy of one proxy instance.
#[derive(Debug, Clone)]
pub struct RequestForwarder<T> {
    transport: T,
    retries: RetryPolicy,
}

impl<T: Transport> RequestForwarder<T> {
    pub fn new(transport: T, retries: RetryPolicy) -> Self {
        Self { transport, retries }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retries(&self) -> RetryPolicy {
        self.retries
    }

    /// Forward one request. Upstream 4xx/5xx are returned as `Ok`.
    pub async fn forward(
        &self,
        method: Method,
        url: String,
        headers: OutboundHeaders,
        body: Body,
    ) -> Result<UpstreamResponse, TransportError> {
        tracing::debug!(headers = ?headers, "Request headers");

        let request = UpstreamRequest {
            method: method.clone(),
            url: url.clone(),
            headers,
            body,
            follow_redirects: false,
            retries: self.retries,
        };

        match self.transport.forward(request).await {
            Ok(response) => {
                tracing::debug!(
                    status = %response.status,
                    headers = ?response.headers,
                    "Proxy response header"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::error!(method = %method, url = %url, error = %e, "Upstream request failed");
                Err(e)
            }
        }
    }
}
