//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (deadline on the response head)
//!     → On connect failure: retries.rs (retry if the policy and body allow)
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Retries only when nothing reached the upstream (connect failures)
//! - A streamed request body is never replayed

pub mod backoff;
pub mod retries;
pub mod timeouts;
