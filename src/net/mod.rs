//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy instance
//!     → pool.rs (PooledTransport → shared ConnectionPool)
//!     → hyper-util client (keep-alive, http/https)
//!     → Upstream server
//! ```
//!
//! # Design Decisions
//! - One pool per process, shared by every proxy instance
//! - TLS to the upstream uses webpki roots; no custom certificate handling

pub mod pool;

pub use pool::{ConnectionPool, PooledTransport};
