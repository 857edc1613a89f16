//! Retry delay schedules.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How successive retry delays are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// The same delay before every retry.
    #[default]
    Fixed,
    /// Doubling delay with jitter, capped.
    Exponential,
}

/// Delay before retry number `attempt` (1-based).
pub fn retry_delay(kind: BackoffKind, attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    match kind {
        BackoffKind::Fixed => Duration::from_millis(base_ms),
        BackoffKind::Exponential => calculate_backoff(attempt, base_ms, max_ms),
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000);
        assert!(max.as_millis() < 1100);
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        for attempt in 1..=5 {
            assert_eq!(
                retry_delay(BackoffKind::Fixed, attempt, 10_000, 60_000),
                Duration::from_secs(10)
            );
        }
    }
}
