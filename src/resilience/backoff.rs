//! Exponential backoff with jitter between upstream attempts.

use std::time::Duration;
use rand::Rng;

use crate::resilience::retries::{BASE_DELAY_MS, MAX_DELAY_MS};

/// Delay before retry number `attempt` (1-based), using the default bounds.
pub fn retry_delay(attempt: u32) -> Duration {
    calculate_backoff(attempt, BASE_DELAY_MS, MAX_DELAY_MS)
}

/// Calculate exponential backoff delay with up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(exponential).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
