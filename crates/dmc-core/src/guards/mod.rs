//! Generic guards.
//!
//! Each guard is a pure, total predicate over a slice of [`GuardContext`] and
//! one or two [`GuardPolicy`] thresholds. A failing guard yields exactly one
//! [`ReasonCode`].
//!
//! [`GUARD_ORDER`] fixes the evaluation sequence. Downstream diagnostics rely
//! on first-failure semantics, so the order must not change without bumping
//! [`GUARD_ORDER_VERSION`].

pub mod circuit_breaker;
pub mod cooldown;
pub mod error_rate;
pub mod ops_health;
pub mod rate_limit;
pub mod staleness;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::GuardContext;
use crate::policy::GuardPolicy;

pub use circuit_breaker::circuit_breaker_guard;
pub use cooldown::cooldown_guard;
pub use error_rate::error_rate_guard;
pub use ops_health::ops_health_guard;
pub use rate_limit::rate_limit_guard;
pub use staleness::staleness_guard;

/// Flag recorded when the modulator catches an unexpected error.
pub const MODULATE_EXCEPTION: &str = "modulate_exception";

/// Bumped whenever [`GUARD_ORDER`] changes.
pub const GUARD_ORDER_VERSION: u32 = 1;

/// Fixed evaluation order.
pub const GUARD_ORDER: [GuardName; 6] = [
    GuardName::OpsHealth,
    GuardName::Staleness,
    GuardName::ErrorRate,
    GuardName::RateLimit,
    GuardName::CircuitBreaker,
    GuardName::Cooldown,
];

/// Outcome of a single guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardResult<R = ReasonCode> {
    Pass,
    Fail(R),
}

impl<R> GuardResult<R> {
    pub fn is_pass(&self) -> bool {
        matches!(self, GuardResult::Pass)
    }

    pub fn is_fail(&self) -> bool {
        !self.is_pass()
    }

    pub fn reason(&self) -> Option<&R> {
        match self {
            GuardResult::Pass => None,
            GuardResult::Fail(reason) => Some(reason),
        }
    }
}

/// Names of the generic guards, as they appear in `MismatchInfo::flags`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardName {
    OpsHealth,
    Staleness,
    ErrorRate,
    RateLimit,
    CircuitBreaker,
    Cooldown,
}

impl GuardName {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardName::OpsHealth => "ops_health",
            GuardName::Staleness => "staleness",
            GuardName::ErrorRate => "error_rate",
            GuardName::RateLimit => "rate_limit",
            GuardName::CircuitBreaker => "circuit_breaker",
            GuardName::Cooldown => "cooldown",
        }
    }

    /// Run this guard against `context` with `policy` thresholds.
    pub fn evaluate(&self, context: &GuardContext, policy: &GuardPolicy) -> GuardResult {
        match self {
            GuardName::OpsHealth => ops_health_guard(
                context.ops_deny_actions,
                context.ops_state.as_deref(),
                context.ops_cooldown_until_ms,
                context.now_ms,
            ),
            GuardName::Staleness => staleness_guard(
                context.effective_last_event_ms(),
                context.now_ms,
                policy.staleness_ms,
            ),
            GuardName::ErrorRate => error_rate_guard(
                context.errors_in_window,
                context.steps_in_window,
                policy.max_error_rate,
            ),
            GuardName::RateLimit => {
                rate_limit_guard(context.rate_limit_events, policy.rate_limit_events_max)
            }
            GuardName::CircuitBreaker => {
                circuit_breaker_guard(context.recent_failures, policy.circuit_breaker_failures)
            }
            GuardName::Cooldown => cooldown_guard(context.cooldown_until_ms, context.now_ms),
        }
    }
}

impl fmt::Display for GuardName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable reason codes. Part of the external contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    OpsDenyActions,
    OpsHealthRed,
    OpsCooldownActive,
    StalenessExceeded,
    ErrorRateHigh,
    RateLimitExceeded,
    CircuitBreaker,
    CooldownActive,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::OpsDenyActions => "ops_deny_actions",
            ReasonCode::OpsHealthRed => "ops_health_red",
            ReasonCode::OpsCooldownActive => "ops_cooldown_active",
            ReasonCode::StalenessExceeded => "staleness_exceeded",
            ReasonCode::ErrorRateHigh => "error_rate_high",
            ReasonCode::RateLimitExceeded => "rate_limit_exceeded",
            ReasonCode::CircuitBreaker => "circuit_breaker",
            ReasonCode::CooldownActive => "cooldown_active",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn guard_order_is_fixed() {
        let names: Vec<&str> = GUARD_ORDER.iter().map(|g| g.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ops_health",
                "staleness",
                "error_rate",
                "rate_limit",
                "circuit_breaker",
                "cooldown"
            ]
        );
        assert_eq!(GUARD_ORDER_VERSION, 1);
    }

    #[test]
    fn guard_names_are_unique() {
        let unique: HashSet<_> = GUARD_ORDER.iter().collect();
        assert_eq!(unique.len(), GUARD_ORDER.len());
    }

    #[test]
    fn serde_names_match_as_str() {
        for guard in GUARD_ORDER {
            let json = serde_json::to_value(guard).unwrap();
            assert_eq!(json, guard.as_str());
        }
        let json = serde_json::to_value(ReasonCode::StalenessExceeded).unwrap();
        assert_eq!(json, "staleness_exceeded");
    }

    #[test]
    fn all_guards_pass_on_default_context() {
        let context = GuardContext::default();
        let policy = GuardPolicy::default();
        for guard in GUARD_ORDER {
            assert!(guard.evaluate(&context, &policy).is_pass(), "{guard} failed");
        }
    }

    #[test]
    fn dispatch_reaches_each_guard() {
        let policy = GuardPolicy::default();

        let ctx = GuardContext::at(0).with_ops_state("RED");
        assert_eq!(
            GuardName::OpsHealth.evaluate(&ctx, &policy),
            GuardResult::Fail(ReasonCode::OpsHealthRed)
        );

        let ctx = GuardContext::at(10_000).with_last_event(0);
        assert_eq!(
            GuardName::Staleness.evaluate(&ctx, &policy),
            GuardResult::Fail(ReasonCode::StalenessExceeded)
        );

        let ctx = GuardContext::at(0).with_errors(5, 10);
        assert_eq!(
            GuardName::ErrorRate.evaluate(&ctx, &policy),
            GuardResult::Fail(ReasonCode::ErrorRateHigh)
        );

        let ctx = GuardContext::at(0).with_rate_limit_events(11);
        assert_eq!(
            GuardName::RateLimit.evaluate(&ctx, &policy),
            GuardResult::Fail(ReasonCode::RateLimitExceeded)
        );

        let ctx = GuardContext::at(0).with_recent_failures(5);
        assert_eq!(
            GuardName::CircuitBreaker.evaluate(&ctx, &policy),
            GuardResult::Fail(ReasonCode::CircuitBreaker)
        );

        let ctx = GuardContext::at(0).with_cooldown_until(1);
        assert_eq!(
            GuardName::Cooldown.evaluate(&ctx, &policy),
            GuardResult::Fail(ReasonCode::CooldownActive)
        );
    }

    #[test]
    fn result_accessors() {
        let fail: GuardResult = GuardResult::Fail(ReasonCode::CooldownActive);
        assert!(fail.is_fail());
        assert_eq!(fail.reason(), Some(&ReasonCode::CooldownActive));
        assert!(GuardResult::<ReasonCode>::Pass.reason().is_none());
    }
}
