//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before retry attempt `attempt` (1-based), doubling from
/// `base_ms` up to `max_ms`, with up to 10% jitter added to spread
/// synchronized retries.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponent = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(exponent).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
