//! Reverse proxy core.
//!
//! # Data Flow
//! ```text
//! ProxyRequest (request.rs)
//!     → rewrite.rs (redirect rules, first match wins)
//!     → headers.rs (CGI-style names → outbound headers)
//!     → url.rs (upstream origin + quoted path + re-encoded query)
//!     → forwarder.rs (Transport, never follows redirects)
//!     → response.rs (Location + Content-Type rewriting)
//!     → ProxyOutcome (pipeline.rs)
//! ```
//!
//! # Design Decisions
//! - Each proxy instance validates its upstream and rewrite rules at construction
//! - Instances are immutable and shared across concurrent requests
//! - Bodies stream through in both directions

pub mod error;
pub mod forwarder;
pub mod headers;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod rewrite;
pub mod upstream;
pub mod url;

pub use error::{ProxyError, TransportError};
pub use forwarder::{RequestForwarder, Transport, UpstreamRequest, UpstreamResponse};
pub use headers::{HeaderTranslator, OutboundHeaders, StandardHeaders};
pub use pipeline::{ProxyOutcome, ReverseProxy};
pub use request::ProxyRequest;
pub use rewrite::{RewriteRule, RewriteRules};
pub use upstream::UpstreamTarget;
