//! Upstream response post-processing.
//!
//! Two independent header-only steps; the body is never touched.
//!
//! - Location: a redirect that points at the upstream's own origin (under
//!   `http://` or `https://`) is rewritten to the client-facing scheme and host.
//! - Content-Type: when the upstream sent none, guess from the request path's
//!   extension, else use the configured default. An upstream value is never replaced.

use axum::http::{header, HeaderValue};

use crate::proxy::forwarder::UpstreamResponse;
use crate::proxy::upstream::UpstreamTarget;

/// Rewrite `location` if it starts with the upstream's scheme + netloc.
///
/// The prefix must end on an authority boundary, so `http://backend.evil`
/// is not mistaken for `http://backend`.
pub fn rewrite_location(location: &str, upstream: &UpstreamTarget, public_origin: &str) -> Option<String> {
    ["http://", "https://"].iter().find_map(|scheme| {
        let rest = location
            .strip_prefix(scheme)?
            .strip_prefix(upstream.netloc())?;
        let on_boundary = rest.is_empty() || rest.starts_with(['/', '?', '#']);
        on_boundary.then(|| format!("{}{}", public_origin, rest))
    })
}

/// Client-facing origin of the inbound request, e.g. `https://proxy.example.com`.
pub fn public_origin(secure: bool, host: &str) -> String {
    let scheme = if secure { "https://" } else { "http://" };
    format!("{}{}", scheme, host)
}

/// Apply the Location rewrite to a response in place.
pub fn replace_host_on_redirect_location(
    response: &mut UpstreamResponse,
    upstream: &UpstreamTarget,
    secure: bool,
    host: &str,
) {
    let Some(location) = response
        .headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
    else {
        return;
    };

    let Some(rewritten) = rewrite_location(location, upstream, &public_origin(secure, host)) else {
        return;
    };

    match HeaderValue::from_str(&rewritten) {
        Ok(value) => {
            tracing::debug!(location = %rewritten, "Proxy response LOCATION");
            response.headers.insert(header::LOCATION, value);
        }
        Err(_) => tracing::warn!(location = %rewritten, "Rewritten Location is not a valid header value"),
    }
}

/// Set Content-Type when the upstream omitted it.
pub fn set_content_type(response: &mut UpstreamResponse, request_path: &str, default: &HeaderValue) {
    if response.headers.contains_key(header::CONTENT_TYPE) {
        return;
    }

    let value = mime_guess::from_path(request_path)
        .first_raw()
        .map(HeaderValue::from_static)
        .unwrap_or_else(|| default.clone());

    tracing::debug!(content_type = ?value, "Proxy response CONTENT-TYPE");
    response.headers.insert(header::CONTENT_TYPE, value);
}
