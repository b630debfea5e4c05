use super::{GuardResult, ReasonCode};

pub fn cooldown_guard(cooldown_until_ms: Option<f64>, now_ms: f64) -> GuardResult {
    match cooldown_until_ms {
        Some(until) if now_ms < until => GuardResult::Fail(ReasonCode::CooldownActive),
        _ => GuardResult::Pass,
    }
}
