use super::{GuardResult, ReasonCode};

/// Fail when the window's event count is strictly above `events_max`.
pub fn rate_limit_guard(events_in_window: f64, events_max: i64) -> GuardResult {
    if events_in_window > events_max as f64 {
        GuardResult::Fail(ReasonCode::RateLimitExceeded)
    } else {
        GuardResult::Pass
    }
}
