//! Upstream URL construction.
//!
//! # Responsibilities
//! - Join origin and request path with exactly one `/`
//! - Percent-encode the path with the nginx safe-character set (space → `+`)
//! - Re-encode query parameters with form encoding, keeping repeated keys
//!
//! # Design Decisions
//! - The origin is used verbatim as configured; only the path is encoded
//! - Query pairs keep their received order; nothing is merged or deduplicated

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::form_urlencoded;

use crate::proxy::upstream::UpstreamTarget;

/// Characters left unescaped in forwarded paths, as nginx does
/// (`ngx_escape_uri`). Alphanumerics are always safe.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'<')
    .remove(b'.')
    .remove(b';')
    .remove(b'>')
    .remove(b'(')
    .remove(b'}')
    .remove(b'*')
    .remove(b'+')
    .remove(b'|')
    .remove(b'~')
    .remove(b'=')
    .remove(b'-')
    .remove(b'$')
    .remove(b'/')
    .remove(b'_')
    .remove(b':')
    .remove(b'^')
    .remove(b'@')
    .remove(b')')
    .remove(b'[')
    .remove(b'{')
    .remove(b']')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'!')
    .remove(b',')
    .remove(b'"')
    .remove(b'`');

/// Percent-encode a request path. Spaces become `+`.
pub fn quote_path(path: &str) -> String {
    path.split(' ')
        .map(|segment| utf8_percent_encode(segment, PATH_SAFE).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Decode a received query string and re-encode it with form encoding.
///
/// Returns `None` when there are no parameters.
pub fn encode_query(query: &str) -> Option<String> {
    let mut pairs = form_urlencoded::parse(query.as_bytes()).peekable();
    pairs.peek()?;

    Some(
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish(),
    )
}

/// Build the absolute upstream URL for a forwarded path and optional query.
pub fn build_upstream_url(target: &UpstreamTarget, path: &str, query: Option<&str>) -> String {
    let origin = target.origin();
    let path = quote_path(path);

    let mut url = if path.is_empty() {
        origin.to_string()
    } else {
        format!(
            "{}/{}",
            origin.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };

    if let Some(encoded) = query.and_then(encode_query) {
        url.push('?');
        url.push_str(&encoded);
    }

    tracing::debug!(request_url = %url, "Request URL");
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(origin: &str) -> UpstreamTarget {
        UpstreamTarget::parse(origin).unwrap()
    }

    #[test]
    fn adds_separator_when_origin_has_none() {
        let url = build_upstream_url(&target("http://example.com/area"), "login", None);
        assert_eq!(url, "http://example.com/area/login");
    }

    #[test]
    fn never_doubles_separator() {
        let url = build_upstream_url(&target("http://example.com/"), "login", None);
        assert_eq!(url, "http://example.com/login");

        let url = build_upstream_url(&target("http://example.com/"), "/login", None);
        assert_eq!(url, "http://example.com/login");
    }

    #[test]
    fn empty_path_keeps_origin_verbatim() {
        assert_eq!(
            build_upstream_url(&target("http://example.com/"), "", None),
            "http://example.com/"
        );
        assert_eq!(
            build_upstream_url(&target("http://example.com"), "", None),
            "http://example.com"
        );
    }

    #[test]
    fn tilde_is_not_escaped() {
        let url = build_upstream_url(&target("http://example.com"), "~", None);
        assert_eq!(url, "http://example.com/~");
    }

    #[test]
    fn space_becomes_plus() {
        let url = build_upstream_url(&target("http://example.com"), " test test", None);
        assert_eq!(url, "http://example.com/+test+test");
    }

    #[test]
    fn url_in_path_is_forwarded_as_path() {
        let url = build_upstream_url(&target("http://example.com/"), "http://example.org", None);
        assert_eq!(url, "http://example.com/http://example.org");
    }

    #[test]
    fn safe_set_passes_through() {
        let safe = "<.;>(}*+|~=-$/_:^@)[{]&'!,\"`";
        assert_eq!(quote_path(safe), safe);
    }

    #[test]
    fn escapes_everything_else() {
        assert_eq!(quote_path("a#b?c%d"), "a%23b%3Fc%25d");
        assert_eq!(quote_path("caf\u{e9}"), "caf%C3%A9");
        assert_eq!(quote_path("back\\slash"), "back%5Cslash");
    }

    #[test]
    fn repeated_query_keys_stay_repeated_in_order() {
        let url = build_upstream_url(&target("http://example.com"), "search", Some("a=1&b=2&a=3"));
        assert_eq!(url, "http://example.com/search?a=1&b=2&a=3");
    }

    #[test]
    fn query_uses_form_encoding() {
        assert_eq!(encode_query("q=hello%20world").as_deref(), Some("q=hello+world"));
        assert_eq!(encode_query("q=a+b").as_deref(), Some("q=a+b"));
        assert_eq!(encode_query("next=/home").as_deref(), Some("next=%2Fhome"));
        assert_eq!(encode_query("flag").as_deref(), Some("flag="));
    }

    #[test]
    fn empty_query_is_dropped() {
        assert_eq!(encode_query(""), None);
        let url = build_upstream_url(&target("http://example.com"), "x", Some(""));
        assert_eq!(url, "http://example.com/x");
    }
}
