use super::{GuardResult, ReasonCode};

/// Trip once recent failures reach the threshold.
pub fn circuit_breaker_guard(recent_failures: f64, circuit_breaker_failures: i64) -> GuardResult {
    if recent_failures >= circuit_breaker_failures as f64 {
        GuardResult::Fail(ReasonCode::CircuitBreaker)
    } else {
        GuardResult::Pass
    }
}
