//! Hop-by-hop header handling.
//!
//! # Responsibilities
//! - Identify connection-level headers that must not cross the proxy
//! - Strip them from relayed upstream responses
//!
//! # Design Decisions
//! - Applied in both directions
//! - `Content-Length` is end-to-end and kept, so streamed bodies stay length-delimited

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName};

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailer",
        "transfer-encoding",
        "upgrade",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Whether `name` is a hop-by-hop header. Case-insensitive.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP
        .iter()
        .any(|hop| hop.as_str().eq_ignore_ascii_case(name))
}

/// Remove every hop-by-hop header from `headers`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}
