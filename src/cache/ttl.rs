// Named cache lifetimes.
// Callers pick a lifetime by how often the underlying truth changes.

use std::time::Duration;

/// 5 minutes.
pub const SHORT: Duration = Duration::from_millis(300_000);

/// 30 minutes.
pub const MEDIUM: Duration = Duration::from_millis(1_800_000);

/// 12 hours. Pure computations such as syntax highlighting of fixed input.
pub const LONG: Duration = Duration::from_millis(43_200_000);

/// 3 days. Session state that should survive a typical work session.
pub const VERY_LONG: Duration = Duration::from_millis(259_200_000);

/// TTL applied when a caller has no opinion.
pub const DEFAULT_TTL: Duration = MEDIUM;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_durations() {
        assert_eq!(SHORT, Duration::from_secs(5 * 60));
        assert_eq!(MEDIUM, Duration::from_secs(30 * 60));
        assert_eq!(LONG, Duration::from_secs(12 * 60 * 60));
        assert_eq!(VERY_LONG, Duration::from_secs(3 * 24 * 60 * 60));
        assert_eq!(DEFAULT_TTL, MEDIUM);
    }
}
