//! Response handling.
//!
//! # Responsibilities
//! - Turn a pipeline outcome into the client response
//! - Strip hop-by-hop headers from relayed responses
//! - Map transport failures to gateway status codes
//!
//! # Design Decisions
//! - Relayed bodies are streamed, never buffered
//! - Upstream timeouts result in 504 Gateway Timeout, every other failure in 502

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::proxy::error::{ProxyError, TransportError};
use crate::proxy::forwarder::UpstreamResponse;
use crate::proxy::pipeline::ProxyOutcome;
use crate::security::headers::strip_hop_by_hop;

pub fn outcome_response(outcome: ProxyOutcome) -> Response {
    match outcome {
        ProxyOutcome::Redirect(target) => redirect(&target),
        ProxyOutcome::Forwarded(upstream) => relay(upstream),
    }
}

/// `302 Found` pointing at `target`.
pub fn redirect(target: &str) -> Response {
    match HeaderValue::from_str(target) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::error!(target = %target, "Rewrite target is not a valid Location");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Relay the upstream response to the client.
pub fn relay(upstream: UpstreamResponse) -> Response {
    let UpstreamResponse {
        status,
        mut headers,
        body,
    } = upstream;
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

pub fn error_response(error: &ProxyError) -> Response {
    let status = match error {
        ProxyError::Transport(TransportError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };

    let mut response = Response::new(Body::from(status.canonical_reason().unwrap_or_default()));
    *response.status_mut() = status;
    response
}
