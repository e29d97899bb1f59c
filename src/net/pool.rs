//! Process-wide upstream connection pool.
//!
//! # Responsibilities
//! - Build the HTTP(S) client exactly once per process
//! - Hand the same pool to every proxy instance
//! - Perform upstream calls with connect and response-head deadlines
//! - Retry connect failures for replayable requests when the policy asks for it
//!
//! # Design Decisions
//! - `OnceLock` gives race-free single construction; the first caller's settings win
//! - The client never follows redirects
//! - Dropping an in-flight call (client went away) drops the upstream request
//!   and its connection; the response body is streamed, so dropping it aborts the read

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::{Body, HttpBody};
use axum::http::Request;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};

use crate::config::TimeoutConfig;
use crate::proxy::error::TransportError;
use crate::proxy::forwarder::{Transport, UpstreamRequest, UpstreamResponse};
use crate::resilience::backoff::retry_delay;
use crate::resilience::retries::is_retryable;
use crate::resilience::timeouts::with_deadline;

/// HTTP client type for forwarding requests.
type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

static SHARED_POOL: OnceLock<Arc<ConnectionPool>> = OnceLock::new();

/// Bytes the forwarded path may carry that `http::Uri` refuses.
const URI_REJECTED: &AsciiSet = &CONTROLS.add(b'<').add(b'>').add(b'`');

/// Escape what `http::Uri` cannot hold; everything else is sent as built.
fn uri_safe(url: &str) -> String {
    utf8_percent_encode(url, URI_REJECTED).to_string()
}

/// Pooled keep-alive connections to every upstream.
#[derive(Debug)]
pub struct ConnectionPool {
    client: HttpClient,
    request_timeout: Duration,
}

impl ConnectionPool {
    /// Create a standalone pool. Most callers want [`ConnectionPool::shared`].
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .http1_title_case_headers(true)
            .build(https);

        Self {
            client,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    /// The process-wide pool, created with default timeouts on first use.
    pub fn shared() -> Arc<ConnectionPool> {
        Self::install(&TimeoutConfig::default())
    }

    /// The process-wide pool, created with `timeouts` if it does not exist yet.
    pub fn install(timeouts: &TimeoutConfig) -> Arc<ConnectionPool> {
        let mut created = false;
        let pool = SHARED_POOL.get_or_init(|| {
            created = true;
            tracing::info!(
                connect_secs = timeouts.connect_secs,
                request_secs = timeouts.request_secs,
                idle_secs = timeouts.idle_secs,
                "Upstream connection pool created"
            );
            Arc::new(ConnectionPool::new(timeouts))
        });

        if !created {
            tracing::trace!("Reusing existing upstream connection pool");
        }
        Arc::clone(pool)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Send one request and wait for the response head.
    pub async fn send(&self, request: Request<Body>) -> Result<UpstreamResponse, TransportError> {
        let response = with_deadline(self.request_timeout, async {
            self.client.request(request).await.map_err(|e| {
                if e.is_connect() {
                    TransportError::Connect(Box::new(e))
                } else {
                    TransportError::Protocol(Box::new(e))
                }
            })
        })
        .await?;

        let (parts, body) = response.into_parts();
        Ok(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body: Body::new(body),
        })
    }
}

/// [`Transport`] backed by a [`ConnectionPool`].
#[derive(Debug, Clone)]
pub struct PooledTransport {
    pool: Arc<ConnectionPool>,
}

impl PooledTransport {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Transport over the process-wide pool.
    pub fn shared() -> Self {
        Self::new(ConnectionPool::shared())
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }
}

impl Default for PooledTransport {
    fn default() -> Self {
        Self::shared()
    }
}

impl Transport for PooledTransport {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let UpstreamRequest {
            method,
            url,
            headers,
            body,
            retries,
            ..
        } = request;

        let uri = uri_safe(&url);
        let header_map = headers.to_header_map();
        let max_attempts = retries.max_attempts(body.is_end_stream());
        let mut body = Some(body);
        let mut attempt = 0;

        loop {
            attempt += 1;

            // Only an empty body is ever replayed, so later attempts send an empty one.
            let mut req = Request::builder()
                .method(method.clone())
                .uri(uri.as_str())
                .body(body.take().unwrap_or_else(Body::empty))
                .map_err(TransportError::InvalidRequest)?;
            *req.headers_mut() = header_map.clone();

            match self.pool.send(req).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < max_attempts && is_retryable(&e) => {
                    let delay = retry_delay(attempt);
                    tracing::info!(
                        url = %url,
                        attempt,
                        delay = ?delay,
                        error = %e,
                        "Retrying after connect failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
