//! Authenticated principal handed over by the host pipeline.
//!
//! Authentication itself happens outside the proxy. Whatever layer performs it
//! attaches a [`Principal`] to the request extensions; the proxy only reads it.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::Next,
    response::Response,
};

/// Context attached to authenticated requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    /// Identifier forwarded as `Remote-User`.
    pub id: String,
    /// Inactive principals are never announced upstream.
    pub active: bool,
}

impl Principal {
    pub fn active(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: true,
        }
    }

    pub fn inactive(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: false,
        }
    }
}

/// Attach a [`Principal`] read from a header set by a trusted authentication front end.
///
/// The header is removed from the request so it never reaches the upstream verbatim.
pub async fn trusted_header_principal(
    State(header): State<HeaderName>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let user = req
        .headers_mut()
        .remove(&header)
        .and_then(|v| v.to_str().ok().map(str::trim).map(str::to_string))
        .filter(|v| !v.is_empty());

    if let Some(id) = user {
        tracing::debug!(user = %id, "Principal attached from trusted header");
        req.extensions_mut().insert(Principal::active(id));
    }

    next.run(req).await
}
