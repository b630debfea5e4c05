use super::{GuardResult, ReasonCode};

/// Fail when the last event is older than `staleness_ms`.
pub fn staleness_guard(last_event_ts_ms: f64, now_ms: f64, staleness_ms: i64) -> GuardResult {
    if now_ms - last_event_ts_ms > staleness_ms as f64 {
        GuardResult::Fail(ReasonCode::StalenessExceeded)
    } else {
        GuardResult::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_window_passes() {
        assert_eq!(staleness_guard(1_000.0, 1_500.0, 1_000), GuardResult::Pass);
        assert_eq!(staleness_guard(1_000.0, 2_000.0, 1_000), GuardResult::Pass);
    }

    #[test]
    fn beyond_window_fails() {
        assert_eq!(
            staleness_guard(1_000.0, 2_001.0, 1_000),
            GuardResult::Fail(ReasonCode::StalenessExceeded)
        );
        assert_eq!(
            staleness_guard(1_000.0, 2_500.0, 1_000),
            GuardResult::Fail(ReasonCode::StalenessExceeded)
        );
    }

    #[test]
    fn fractional_milliseconds_count() {
        assert!(staleness_guard(1_000.0, 2_000.5, 1_000).is_fail());
        assert!(staleness_guard(1_000.25, 2_000.0, 1_000).is_pass());
    }

    #[test]
    fn future_event_passes() {
        assert_eq!(staleness_guard(5_000.0, 1_000.0, 0), GuardResult::Pass);
    }

    #[test]
    fn extreme_timestamps() {
        assert!(staleness_guard(-f64::MAX, f64::MAX, i64::MAX).is_fail());
        assert!(staleness_guard(f64::MAX, -f64::MAX, 0).is_pass());
    }
}
