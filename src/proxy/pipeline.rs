//! The per-request forwarding pipeline.
//!
//! ```text
//! ProxyRequest
//!     → rewrite rules ── match ──▶ ProxyOutcome::Redirect
//!     → header translation (+ Remote-User)
//!     → upstream URL
//!     → RequestForwarder (Transport)
//!     → Location / Content-Type rewriting
//!     → ProxyOutcome::Forwarded
//! ```

use std::sync::Arc;

use axum::http::HeaderValue;

use crate::config::ProxySettings;
use crate::net::pool::PooledTransport;
use crate::proxy::error::ProxyError;
use crate::proxy::forwarder::{RequestForwarder, Transport, UpstreamResponse};
use crate::proxy::headers::{HeaderTranslator, OutboundHeaders, StandardHeaders, REMOTE_USER};
use crate::proxy::request::ProxyRequest;
use crate::proxy::response::{replace_host_on_redirect_location, set_content_type};
use crate::proxy::rewrite::RewriteRules;
use crate::proxy::upstream::UpstreamTarget;
use crate::proxy::url::build_upstream_url;
use crate::resilience::retries::RetryPolicy;

/// What the host should do with a request.
#[derive(Debug)]
pub enum ProxyOutcome {
    /// A rewrite rule matched; answer with a redirect to this target.
    Redirect(String),
    /// The upstream answered; relay this response.
    Forwarded(UpstreamResponse),
}

/// A configured, validated proxy instance.
///
/// Read-only after construction and safe to share across concurrent requests.
pub struct ReverseProxy<T = PooledTransport> {
    upstream: UpstreamTarget,
    rewrite: RewriteRules,
    translator: Arc<dyn HeaderTranslator>,
    add_remote_user: bool,
    preserve_host: bool,
    default_content_type: HeaderValue,
    forwarder: RequestForwarder<T>,
}

impl ReverseProxy<PooledTransport> {
    /// Build a proxy forwarding through the process-wide connection pool.
    pub fn new(settings: &ProxySettings) -> Result<Self, ProxyError> {
        Self::with_transport(settings, PooledTransport::shared())
    }
}

impl<T: Transport> ReverseProxy<T> {
    /// Validate `settings` and build a proxy over `transport`.
    pub fn with_transport(settings: &ProxySettings, transport: T) -> Result<Self, ProxyError> {
        let upstream = UpstreamTarget::parse(&settings.upstream)?;
        let rewrite = RewriteRules::compile(&settings.rewrite)?;
        let default_content_type = HeaderValue::from_str(&settings.default_content_type)
            .map_err(|_| ProxyError::InvalidContentType(settings.default_content_type.clone()))?;

        tracing::debug!(
            upstream = %upstream,
            rewrite_rules = rewrite.len(),
            add_remote_user = settings.add_remote_user,
            "Proxy instance ready"
        );

        Ok(Self {
            upstream,
            rewrite,
            translator: Arc::new(StandardHeaders),
            add_remote_user: settings.add_remote_user,
            preserve_host: settings.preserve_host,
            default_content_type,
            forwarder: RequestForwarder::new(transport, RetryPolicy::from_config(settings.retries)),
        })
    }

    /// Replace the header translation step.
    pub fn with_header_translator(mut self, translator: impl HeaderTranslator) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    pub fn upstream(&self) -> &UpstreamTarget {
        &self.upstream
    }

    pub fn transport(&self) -> &T {
        self.forwarder.transport()
    }

    /// Redirect target if a rewrite rule matches the request's full path.
    pub fn redirect_for(&self, request: &ProxyRequest) -> Option<String> {
        self.rewrite.redirect_for(&request.full_path)
    }

    /// Headers that will be sent upstream.
    ///
    /// `Remote-User` is set last, overwriting any client or translator value,
    /// when injection is enabled and the principal is active.
    pub fn request_headers(&self, request: &ProxyRequest) -> OutboundHeaders {
        let mut headers = self
            .translator
            .proxy_request_headers(request, self.preserve_host);

        if self.add_remote_user {
            if let Some(principal) = request.principal.as_ref().filter(|p| p.active) {
                headers.insert(REMOTE_USER, principal.id.clone());
                tracing::info!(user = %principal.id, "REMOTE_USER set");
            }
        }

        headers
    }

    /// Run the full pipeline for one request.
    pub async fn handle(&self, request: ProxyRequest) -> Result<ProxyOutcome, ProxyError> {
        if let Some(target) = self.redirect_for(&request) {
            return Ok(ProxyOutcome::Redirect(target));
        }

        let headers = self.request_headers(&request);
        let url = build_upstream_url(&self.upstream, &request.path, request.query());
        let request_path = request.request_path().to_string();

        let ProxyRequest {
            method,
            body,
            secure,
            host,
            ..
        } = request;

        let mut response = self.forwarder.forward(method, url, headers, body).await?;

        replace_host_on_redirect_location(&mut response, &self.upstream, secure, &host);
        set_content_type(&mut response, &request_path, &self.default_content_type);

        Ok(ProxyOutcome::Forwarded(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderName, Method, StatusCode};

    use crate::config::RewriteConfig;
    use crate::proxy::error::TransportError;
    use crate::proxy::forwarder::UpstreamRequest;
    use crate::proxy::headers::translate_headers;
    use crate::security::Principal;

    #[derive(Debug, PartialEq)]
    struct RecordedCall {
        method: Method,
        url: String,
        headers: OutboundHeaders,
        body: Vec<u8>,
        follow_redirects: bool,
        retries: RetryPolicy,
    }

    /// Records every call and answers with a canned response.
    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<RecordedCall>>,
        location: Option<&'static str>,
        content_type: Option<&'static str>,
        fail: bool,
    }

    impl RecordingTransport {
        fn calls(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
            self.calls.lock().unwrap()
        }
    }

    impl Transport for RecordingTransport {
        async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
            let body = to_bytes(request.body, usize::MAX).await.unwrap().to_vec();
            self.calls.lock().unwrap().push(RecordedCall {
                method: request.method,
                url: request.url,
                headers: request.headers,
                body,
                follow_redirects: request.follow_redirects,
                retries: request.retries,
            });

            if self.fail {
                return Err(TransportError::Connect("connection refused".into()));
            }

            let mut response = UpstreamResponse::new(StatusCode::OK);
            if let Some(location) = self.location {
                response.status = StatusCode::FOUND;
                response
                    .headers
                    .insert(header::LOCATION, HeaderValue::from_static(location));
            }
            if let Some(content_type) = self.content_type {
                response
                    .headers
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
            response.body = Body::from("upstream body");
            Ok(response)
        }
    }

    fn proxy(upstream: &str) -> ReverseProxy<RecordingTransport> {
        proxy_with(ProxySettings::new(upstream), RecordingTransport::default())
    }

    fn proxy_with(settings: ProxySettings, transport: RecordingTransport) -> ReverseProxy<RecordingTransport> {
        ReverseProxy::with_transport(&settings, transport).unwrap()
    }

    fn get(path: &str) -> ProxyRequest {
        ProxyRequest::new(Method::GET, format!("/{}", path))
            .with_path(path)
            .with_header(header::COOKIE, HeaderValue::from_static(""))
    }

    async fn forwarded(proxy: &ReverseProxy<RecordingTransport>, request: ProxyRequest) -> UpstreamResponse {
        match proxy.handle(request).await.unwrap() {
            ProxyOutcome::Forwarded(response) => response,
            ProxyOutcome::Redirect(target) => panic!("unexpected redirect to {}", target),
        }
    }

    fn cookie_only() -> OutboundHeaders {
        [("Cookie", "")].into_iter().collect()
    }

    #[test]
    fn invalid_upstream_fails_construction() {
        let result = ReverseProxy::with_transport(
            &ProxySettings::new("www.example.com"),
            RecordingTransport::default(),
        );
        assert!(matches!(result, Err(ProxyError::InvalidUpstream(_))));
    }

    #[test]
    fn invalid_default_content_type_fails_construction() {
        let mut settings = ProxySettings::new("http://example.com");
        settings.default_content_type = "bad\nvalue".into();
        let result = ReverseProxy::with_transport(&settings, RecordingTransport::default());
        assert!(matches!(result, Err(ProxyError::InvalidContentType(_))));
    }

    #[test]
    fn instances_share_the_connection_pool() {
        let first = ReverseProxy::new(&ProxySettings::new("http://example.com/")).unwrap();
        let mut other = ProxySettings::new("https://other.example.com/api");
        other.retries = Some(5);
        let second = ReverseProxy::new(&other).unwrap();

        assert!(Arc::ptr_eq(first.transport().pool(), second.transport().pool()));
    }

    #[tokio::test]
    async fn forwards_get_with_exact_call() {
        let proxy = proxy("http://example.com/");
        forwarded(&proxy, get("")).await;

        let calls = proxy.transport().calls();
        assert_eq!(
            calls[0],
            RecordedCall {
                method: Method::GET,
                url: "http://example.com/".into(),
                headers: cookie_only(),
                body: Vec::new(),
                follow_redirects: false,
                retries: RetryPolicy::TransportDefault,
            }
        );
    }

    #[tokio::test]
    async fn url_in_path_is_not_treated_as_upstream() {
        let proxy = proxy("http://example.com/");
        forwarded(&proxy, get("http://example.org")).await;

        assert_eq!(proxy.transport().calls()[0].url, "http://example.com/http://example.org");
    }

    #[tokio::test]
    async fn upstream_without_trailing_slash() {
        let proxy = proxy("http://example.com/area");
        forwarded(&proxy, get("login")).await;

        assert_eq!(proxy.transport().calls()[0].url, "http://example.com/area/login");
    }

    #[tokio::test]
    async fn tilde_and_space_encoding() {
        let proxy = proxy("http://example.com");
        forwarded(&proxy, get("~")).await;
        forwarded(&proxy, get(" test test")).await;

        let calls = proxy.transport().calls();
        assert_eq!(calls[0].url, "http://example.com/~");
        assert_eq!(calls[1].url, "http://example.com/+test+test");
    }

    #[tokio::test]
    async fn repeated_query_keys_are_forwarded() {
        let proxy = proxy("http://example.com");
        let request = ProxyRequest::new(Method::GET, "/list?tag=a&page=2&tag=b").with_path("list");
        forwarded(&proxy, request).await;

        assert_eq!(
            proxy.transport().calls()[0].url,
            "http://example.com/list?tag=a&page=2&tag=b"
        );
    }

    #[tokio::test]
    async fn configured_retries_reach_the_transport() {
        let mut settings = ProxySettings::new("http://example.com");
        settings.retries = Some(3);
        let proxy = proxy_with(settings, RecordingTransport::default());
        forwarded(&proxy, get("")).await;

        assert_eq!(proxy.transport().calls()[0].retries, RetryPolicy::Retries(3));
    }

    #[tokio::test]
    async fn body_is_passed_through() {
        let proxy = proxy("http://example.com");
        let request = ProxyRequest::new(Method::POST, "/submit")
            .with_body(Body::from("payload=1"))
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));
        forwarded(&proxy, request).await;

        let calls = proxy.transport().calls();
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(calls[0].body, b"payload=1");
        assert_eq!(
            calls[0].headers.get("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[tokio::test]
    async fn rewrite_match_short_circuits() {
        let mut settings = ProxySettings::new("http://example.com");
        settings.rewrite = vec![
            RewriteConfig {
                pattern: r"^/yellow/star/(.*)$".into(),
                to: "/black/hole/$1".into(),
            },
            RewriteConfig {
                pattern: r"^/yellow".into(),
                to: "/never".into(),
            },
        ];
        let proxy = proxy_with(settings, RecordingTransport::default());

        let outcome = proxy
            .handle(ProxyRequest::new(Method::POST, "/yellow/star/sun"))
            .await
            .unwrap();

        assert!(matches!(outcome, ProxyOutcome::Redirect(ref t) if t == "/black/hole/sun"));
        assert!(proxy.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn remote_user_injected_for_active_principal() {
        let mut settings = ProxySettings::new("http://example.com");
        settings.add_remote_user = true;
        let proxy = proxy_with(settings, RecordingTransport::default());

        let request = get("")
            .with_header(HeaderName::from_static("remote-user"), HeaderValue::from_static("mallory"))
            .with_principal(Principal::active("alice"));
        forwarded(&proxy, request).await;

        let calls = proxy.transport().calls();
        assert_eq!(calls[0].headers.get(REMOTE_USER), Some("alice"));
        assert_eq!(calls[0].headers.len(), 2);
    }

    #[tokio::test]
    async fn remote_user_not_injected_when_disabled_or_inactive() {
        let proxy = proxy("http://example.com");
        forwarded(&proxy, get("").with_principal(Principal::active("alice"))).await;

        let mut settings = ProxySettings::new("http://example.com");
        settings.add_remote_user = true;
        let injecting = proxy_with(settings, RecordingTransport::default());
        forwarded(&injecting, get("").with_principal(Principal::inactive("bob"))).await;
        forwarded(&injecting, get("")).await;

        assert!(!proxy.transport().calls()[0].headers.contains(REMOTE_USER));
        for call in injecting.transport().calls().iter() {
            assert!(!call.headers.contains(REMOTE_USER));
        }
    }

    struct DoNotTrack;

    impl HeaderTranslator for DoNotTrack {
        fn proxy_request_headers(&self, request: &ProxyRequest, preserve_host: bool) -> OutboundHeaders {
            let mut headers = translate_headers(&request.headers, preserve_host);
            headers.insert("DNT", "1");
            headers
        }
    }

    #[tokio::test]
    async fn extended_headers_are_sent_alongside_base_headers() {
        let proxy = proxy("http://example.com").with_header_translator(DoNotTrack);
        forwarded(&proxy, get("")).await;

        let mut expected = cookie_only();
        expected.insert("DNT", "1");
        assert_eq!(proxy.transport().calls()[0].headers, expected);
    }

    #[tokio::test]
    async fn location_is_rewritten_to_public_host() {
        let transport = RecordingTransport {
            location: Some("http://example.com/accounts/login/?next=/"),
            ..Default::default()
        };
        let proxy = proxy_with(ProxySettings::new("http://example.com"), transport);

        let request = get("secret").with_host("proxy.example.com").with_secure(true);
        let response = forwarded(&proxy, request).await;

        assert_eq!(response.status, StatusCode::FOUND);
        assert_eq!(
            response.headers[header::LOCATION],
            "https://proxy.example.com/accounts/login/?next=/"
        );
    }

    #[tokio::test]
    async fn content_type_inferred_only_when_missing() {
        let proxy = proxy("http://example.com");
        let response = forwarded(&proxy, get("static/app.css")).await;
        assert_eq!(response.headers[header::CONTENT_TYPE], "text/css");

        let response = forwarded(&proxy, get("api/users")).await;
        assert_eq!(response.headers[header::CONTENT_TYPE], "application/json");

        let transport = RecordingTransport {
            content_type: Some("text/plain"),
            ..Default::default()
        };
        let proxy = proxy_with(ProxySettings::new("http://example.com"), transport);
        let response = forwarded(&proxy, get("page.html")).await;
        assert_eq!(response.headers[header::CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn response_body_is_relayed_unchanged() {
        let proxy = proxy("http://example.com");
        let response = forwarded(&proxy, get("")).await;
        let body = to_bytes(response.body, usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"upstream body");
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let transport = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        let proxy = proxy_with(ProxySettings::new("http://example.com"), transport);

        let err = proxy.handle(get("")).await.unwrap_err();
        assert!(matches!(err, ProxyError::Transport(TransportError::Connect(_))));
        assert_eq!(proxy.transport().calls().len(), 1);
    }
}
