//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before retry number `attempt` (1-based; 0 means no delay).
///
/// The base doubles per attempt up to `max_ms`, then up to 25% jitter is
/// added on top.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 4;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let b1 = calculate_backoff(1, 100, 10_000);
        assert!(b1 >= Duration::from_millis(100) && b1 < Duration::from_millis(125));

        let b3 = calculate_backoff(3, 100, 10_000);
        assert!(b3 >= Duration::from_millis(400) && b3 < Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_is_capped() {
        let capped = calculate_backoff(30, 100, 1000);
        assert!(capped >= Duration::from_millis(1000) && capped < Duration::from_millis(1250));
    }

    #[test]
    fn test_no_delay_before_first_attempt() {
        assert_eq!(calculate_backoff(0, 100, 1000), Duration::ZERO);
    }
}
