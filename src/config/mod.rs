//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → one ProxySettings per proxy instance
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields except the upstream origin have defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ProxyConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProxySettings;
pub use schema::RewriteConfig;
pub use schema::SecurityConfig;
pub use schema::TimeoutConfig;
