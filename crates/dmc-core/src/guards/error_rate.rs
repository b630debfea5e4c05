use super::{GuardResult, ReasonCode};

/// Fail when `errors / steps` exceeds `max_error_rate`. No steps means no rate.
pub fn error_rate_guard(errors_in_window: f64, steps_in_window: f64, max_error_rate: f64) -> GuardResult {
    if steps_in_window <= 0.0 {
        return GuardResult::Pass;
    }
    if errors_in_window / steps_in_window > max_error_rate {
        GuardResult::Fail(ReasonCode::ErrorRateHigh)
    } else {
        GuardResult::Pass
    }
}
