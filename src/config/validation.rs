//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every upstream origin is an http/https URL
//! - Check every rewrite pattern compiles
//! - Detect duplicate mounts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use axum::http::HeaderValue;

use crate::config::schema::ProxyConfig;
use crate::proxy::rewrite::RewriteRule;
use crate::proxy::upstream::UpstreamTarget;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field (e.g., `proxies[0].upstream`).
    pub field: String,
    /// Human readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let timeouts = [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.idle_secs", config.timeouts.idle_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.proxies.is_empty() {
        errors.push(ValidationError::new("proxies", "no proxies configured"));
    }

    let mut mounts = HashSet::new();
    for (i, proxy) in config.proxies.iter().enumerate() {
        let prefix = format!("proxies[{}]", i);

        if !proxy.mount.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{}.mount", prefix),
                format!("'{}' must start with '/'", proxy.mount),
            ));
        }
        if !mounts.insert(proxy.mount.trim_end_matches('/').to_string()) {
            errors.push(ValidationError::new(
                format!("{}.mount", prefix),
                format!("'{}' is mounted more than once", proxy.mount),
            ));
        }

        if let Err(e) = UpstreamTarget::parse(&proxy.upstream) {
            errors.push(ValidationError::new(format!("{}.upstream", prefix), e.to_string()));
        }

        for (j, rule) in proxy.rewrite.iter().enumerate() {
            if let Err(e) = RewriteRule::new(&rule.pattern, &rule.to) {
                errors.push(ValidationError::new(
                    format!("{}.rewrite[{}].pattern", prefix, j),
                    e.to_string(),
                ));
            }
        }

        if HeaderValue::from_str(&proxy.default_content_type).is_err() {
            errors.push(ValidationError::new(
                format!("{}.default_content_type", prefix),
                "not a valid header value",
            ));
        }
    }

    if tracing_subscriber::EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("'{}' is not a valid log filter", config.observability.log_level),
        ));
    }

    if let Some(header) = &config.security.trusted_user_header {
        if axum::http::HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "security.trusted_user_header",
                format!("'{}' is not a valid header name", header),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
