//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, mount dispatch, middleware)
//!     → request.rs (request ID, inbound request → ProxyRequest)
//!     → [proxy pipeline]
//!     → response.rs (relay, redirect or gateway error)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
