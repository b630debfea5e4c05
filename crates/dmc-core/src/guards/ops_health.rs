use super::{GuardResult, ReasonCode};
use crate::context::OPS_STATE_RED;

/// Deny when the ops-health layer denies actions, reports `RED`, or is cooling down.
///
/// Checks run in that order; the first hit decides the reason code.
pub fn ops_health_guard(
    ops_deny_actions: Option<bool>,
    ops_state: Option<&str>,
    ops_cooldown_until_ms: Option<f64>,
    now_ms: f64,
) -> GuardResult {
    if ops_deny_actions == Some(true) {
        return GuardResult::Fail(ReasonCode::OpsDenyActions);
    }
    if ops_state == Some(OPS_STATE_RED) {
        return GuardResult::Fail(ReasonCode::OpsHealthRed);
    }
    match ops_cooldown_until_ms {
        Some(until) if now_ms < until => GuardResult::Fail(ReasonCode::OpsCooldownActive),
        _ => GuardResult::Pass,
    }
}
