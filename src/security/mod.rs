//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → principal.rs (host auth layer attaches Principal)
//!     → proxy pipeline (Remote-User injection reads it)
//!
//! Headers in both directions:
//!     → headers.rs (hop-by-hop stripping)
//! ```
//!
//! # Design Decisions
//! - The proxy never authenticates; it only consumes a Principal
//! - Client-supplied Remote-User is always overwritten when injection is on

pub mod headers;
pub mod principal;

pub use principal::Principal;
