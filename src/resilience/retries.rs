//! Retry policy.
//!
//! # Responsibilities
//! - Represent the per-proxy retry setting (transport default or explicit count)
//! - Decide how many attempts a request may take
//! - Decide which failures are retryable
//!
//! # Design Decisions
//! - Only connect failures are retried; the upstream never saw the request
//! - Only requests with an empty body are retried, since a consumed stream cannot be replayed
//! - Upstream 5xx responses are relayed, never retried

use crate::proxy::error::TransportError;

/// Base delay for exponential backoff in milliseconds.
pub const BASE_DELAY_MS: u64 = 100;

/// Maximum delay for exponential backoff in milliseconds.
pub const MAX_DELAY_MS: u64 = 2000;

/// How many times a failed upstream call may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Single attempt; the connection pool's own retry of requests
    /// canceled on a reused connection still applies.
    #[default]
    TransportDefault,
    /// Up to this many retries after the first attempt.
    Retries(u32),
}

impl RetryPolicy {
    /// `None` keeps the transport default; `Some(n)` overrides it.
    pub fn from_config(retries: Option<u32>) -> Self {
        match retries {
            Some(n) => RetryPolicy::Retries(n),
            None => RetryPolicy::TransportDefault,
        }
    }

    /// Total attempts allowed for a request whose body can (or cannot) be replayed.
    pub fn max_attempts(&self, replayable: bool) -> u32 {
        match self {
            RetryPolicy::Retries(n) if replayable => n.saturating_add(1),
            _ => 1,
        }
    }
}

/// Whether a failure may be retried.
pub fn is_retryable(error: &TransportError) -> bool {
    error.is_connect()
}
