//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID for every inbound request
//! - Convert the framework request into a [`ProxyRequest`]
//! - Work out the client-facing host and scheme
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing, echoed on the response
//! - `X-Forwarded-Proto` is only believed when the listener is configured to trust it

use axum::{
    body::Body,
    http::{header, uri::Scheme, HeaderName, HeaderValue, Request},
};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

use crate::proxy::request::ProxyRequest;
use crate::security::principal::Principal;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Request ID generator producing UUID v4 values.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Sets `x-request-id` on requests that arrive without one.
pub fn set_request_id_layer() -> SetRequestIdLayer<UuidRequestId> {
    SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId)
}

/// Copies `x-request-id` from the request onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Build the pipeline's view of an inbound request.
///
/// `path` is the part of the request path below the proxy's mount point.
pub fn to_proxy_request(request: Request<Body>, path: String, trust_forwarded_proto: bool) -> ProxyRequest {
    let (mut parts, body) = request.into_parts();

    let full_path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()))
        .unwrap_or_else(|| "localhost".to_string());

    let forwarded_https = trust_forwarded_proto
        && parts
            .headers
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
    let secure = forwarded_https || parts.uri.scheme() == Some(&Scheme::HTTPS);

    ProxyRequest {
        method: parts.method,
        path,
        full_path,
        headers: parts.headers,
        body,
        secure,
        host,
        principal: parts.extensions.remove::<Principal>(),
    }
}
