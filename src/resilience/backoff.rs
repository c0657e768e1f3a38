//! Reconnect and retry delays.

use std::time::Duration;
use rand::Rng;

/// Exponential backoff with jitter, used between HTTP retries.
///
/// `attempt` counts failures so far; attempt 0 means no delay.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    Duration::from_millis(capped_delay + jitter(capped_delay))
}

/// Delay before reconnect number `failures` (zero-based): `(n * 10)^2` ms,
/// capped at `max_ms`. The first reconnect is immediate.
pub fn reconnect_delay(failures: u32, max_ms: u64, with_jitter: bool) -> Duration {
    let base = u64::from(failures).saturating_mul(10);
    let delay_ms = base.saturating_mul(base).min(max_ms);
    let extra = if with_jitter { jitter(delay_ms) } else { 0 };
    Duration::from_millis(delay_ms + extra)
}

/// 0 to 10% of the delay.
fn jitter(delay_ms: u64) -> u64 {
    let jitter_range = delay_ms / 10;
    if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    }
}
