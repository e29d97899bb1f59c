//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, forwarded-proto trust).
    pub listener: ListenerConfig,

    /// Timeouts applied to the shared upstream connection pool.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Principal extraction settings.
    pub security: SecurityConfig,

    /// Proxy instances, each mounted under its own path prefix.
    pub proxies: Vec<ProxySettings>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Treat `X-Forwarded-Proto: https` as a secure inbound request.
    /// Only enable behind a TLS-terminating load balancer that sets it.
    pub trust_forwarded_proto: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trust_forwarded_proto: false,
        }
    }
}

/// Timeout configuration for upstream traffic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the upstream to send its response head, in seconds.
    pub request_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            idle_secs: 90,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// Where the authenticated principal comes from.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Header set by a trusted authentication front end carrying the user id.
    pub trusted_user_header: Option<String>,
}

/// A single proxy instance: one upstream origin and its forwarding policy.
///
/// Immutable once handed to [`ReverseProxy::new`](crate::proxy::ReverseProxy::new),
/// which validates it before the instance can serve traffic.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxySettings {
    /// Path prefix the instance is mounted under (e.g., "/api").
    #[serde(default = "default_mount")]
    pub mount: String,

    /// Upstream origin, e.g. "http://127.0.0.1:3000/api".
    pub upstream: String,

    /// Ordered redirect rules; first match wins.
    #[serde(default)]
    pub rewrite: Vec<RewriteConfig>,

    /// Inject `Remote-User` for authenticated, active principals.
    #[serde(default)]
    pub add_remote_user: bool,

    /// Content type used when the upstream omits one and the path has no known extension.
    #[serde(default = "default_content_type")]
    pub default_content_type: String,

    /// Retries on connect failure. Absent means the transport default.
    #[serde(default)]
    pub retries: Option<u32>,

    /// Forward the inbound `Host` header instead of deriving it from the upstream URL.
    #[serde(default)]
    pub preserve_host: bool,
}

impl ProxySettings {
    /// Settings for `upstream` with every other field at its default.
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            mount: default_mount(),
            upstream: upstream.into(),
            rewrite: Vec::new(),
            add_remote_user: false,
            default_content_type: default_content_type(),
            retries: None,
            preserve_host: false,
        }
    }
}

/// A pattern/template redirect rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RewriteConfig {
    /// Regular expression matched from the start of the full path.
    pub pattern: String,

    /// Substitution template (`$1`, `${name}`).
    pub to: String,
}

fn default_mount() -> String {
    "/".to_string()
}

fn default_content_type() -> String {
    "application/json".to_string()
}
