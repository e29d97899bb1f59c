//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build one [`ReverseProxy`] per configured mount
//! - Create the Axum Router dispatching each mount to its proxy
//! - Wire up middleware (tracing, timeout, request ID, trusted principal)
//! - Serve on a listener until shutdown is triggered

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderName, Request},
    middleware,
    response::Response,
    routing::{any, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ProxyConfig, ProxySettings};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, to_proxy_request};
use crate::http::response::{error_response, outcome_response};
use crate::proxy::error::ProxyError;
use crate::proxy::pipeline::ReverseProxy;
use crate::security::principal::trusted_header_principal;

/// State injected into the handlers of one mount.
#[derive(Clone)]
struct MountState {
    proxy: Arc<ReverseProxy>,
    trust_forwarded_proto: bool,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if any proxy entry has an invalid upstream or rewrite rule.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let mut router = Router::new();

        for settings in &config.proxies {
            let state = MountState {
                proxy: Arc::new(ReverseProxy::new(settings)?),
                trust_forwarded_proto: config.listener.trust_forwarded_proto,
            };
            router = mount(router, settings, state);
        }

        let router = Self::build_router(&config, router);
        Ok(Self { router, config })
    }

    /// Wrap the mounted routes with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, mut router: Router) -> Router {
        if let Some(header) = &config.security.trusted_user_header {
            match HeaderName::from_bytes(header.as_bytes()) {
                Ok(name) => {
                    router = router.layer(middleware::from_fn_with_state(name, trusted_header_principal));
                }
                Err(e) => tracing::warn!(header = %header, error = %e, "Ignoring invalid trusted user header"),
            }
        }

        // Outer bound on the whole exchange; the upstream deadline normally fires first.
        let deadline = Duration::from_secs(config.timeouts.request_secs + config.timeouts.connect_secs);

        router
            .layer(TimeoutLayer::new(deadline))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` completes, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            proxies = self.config.proxies.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Route `settings.mount`, its trailing-slash form and everything below it to one proxy.
fn mount(router: Router, settings: &ProxySettings, state: MountState) -> Router {
    let prefix = settings.mount.trim_end_matches('/');
    tracing::info!(
        mount = %settings.mount,
        upstream = %state.proxy.upstream(),
        "Proxy mounted"
    );

    let root: MethodRouter = any(proxy_root).with_state(state.clone());
    let nested: MethodRouter = any(proxy_path).with_state(state);

    let router = if prefix.is_empty() {
        router.route("/", root)
    } else {
        router.route(prefix, root.clone()).route(&format!("{}/", prefix), root)
    };
    router.route(&format!("{}/{{*path}}", prefix), nested)
}

async fn proxy_root(State(state): State<MountState>, request: Request<Body>) -> Response {
    forward(state, String::new(), request).await
}

async fn proxy_path(
    State(state): State<MountState>,
    Path(path): Path<String>,
    request: Request<Body>,
) -> Response {
    forward(state, path, request).await
}

async fn forward(state: MountState, path: String, request: Request<Body>) -> Response {
    let request = to_proxy_request(request, path, state.trust_forwarded_proto);

    tracing::debug!(
        method = %request.method,
        path = %request.full_path,
        "Proxying request"
    );

    match state.proxy.handle(request).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => error_response(&e),
    }
}
