//! Inbound → outbound header translation.
//!
//! # Responsibilities
//! - Restore canonical header names (`HTTP_ACCEPT_ENCODING`, `accept-encoding` → `Accept-Encoding`)
//! - Collapse repeated inbound headers into one value
//! - Drop hop-by-hop headers, and `Host` unless asked to keep it
//! - Offer an override seam that layers on top of the base translation
//!
//! Values are held as Latin-1 text: every inbound byte maps to one char, so
//! non-ASCII values (e.g. a UTF-8 file name) reach the upstream byte for byte.
//!
//! Remote-User injection runs after the translator, so an override cannot
//! un-inject or spoof it.

use std::collections::BTreeMap;

use axum::http::{header::HOST, HeaderMap, HeaderName, HeaderValue};

use crate::proxy::request::ProxyRequest;
use crate::security::headers::is_hop_by_hop;

/// Prefix the CGI/WSGI representation puts in front of every HTTP header.
const CGI_HEADER_PREFIX: &str = "HTTP_";

/// Header carrying the authenticated caller's identifier.
pub const REMOTE_USER: &str = "Remote-User";

/// Canonical header name → single value. Names are canonicalized on insert,
/// so differently-cased duplicates overwrite each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundHeaders {
    entries: BTreeMap<String, String>,
}

impl OutboundHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a header. Returns the previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.entries.insert(canonical_header_name(name), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&canonical_header_name(name))
            .map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&canonical_header_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&canonical_header_name(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert into a wire header map, skipping entries that are not valid HTTP.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let value = latin1_encode(value).and_then(|bytes| HeaderValue::from_bytes(&bytes).ok());
            match (HeaderName::from_bytes(name.as_bytes()), value) {
                (Ok(name), Some(value)) => {
                    map.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping header that is not valid HTTP"),
            }
        }
        map
    }
}

/// One char per byte.
fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`latin1_decode`]; `None` if a char is above U+00FF.
fn latin1_encode(value: &str) -> Option<Vec<u8>> {
    value.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

impl<'a> FromIterator<(&'a str, &'a str)> for OutboundHeaders {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = OutboundHeaders::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Restore the standard form of a header name.
///
/// Strips the `HTTP_` prefix, turns underscores into dashes and title-cases
/// every segment: `HTTP_X_FORWARDED_FOR` → `X-Forwarded-For`.
pub fn canonical_header_name(raw: &str) -> String {
    let name = raw.strip_prefix(CGI_HEADER_PREFIX).unwrap_or(raw);

    let mut out = String::with_capacity(name.len());
    let mut prev_alpha = false;
    for c in name.chars() {
        let c = if c == '_' { '-' } else { c };
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

/// Base translation of inbound headers.
///
/// Repeated headers are joined with `", "`.
pub fn translate_headers(inbound: &HeaderMap, preserve_host: bool) -> OutboundHeaders {
    let mut outbound = OutboundHeaders::new();

    for name in inbound.keys() {
        if is_hop_by_hop(name.as_str()) || (name == HOST && !preserve_host) {
            continue;
        }

        let values: Vec<String> = inbound
            .get_all(name)
            .iter()
            .map(|v| latin1_decode(v.as_bytes()))
            .collect();

        outbound.insert(name.as_str(), values.join(", "));
    }

    outbound
}

/// Override point for outbound header construction.
///
/// Implementors that only want to add headers call [`translate_headers`] first
/// and then insert into the result.
pub trait HeaderTranslator: Send + Sync + 'static {
    fn proxy_request_headers(&self, request: &ProxyRequest, preserve_host: bool) -> OutboundHeaders {
        translate_headers(&request.headers, preserve_host)
    }
}

/// The base translation with nothing added.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardHeaders;

impl HeaderTranslator for StandardHeaders {}
