//! The modulator: runs [`GUARD_ORDER`] and decides pass-through or override.
//!
//! Every entry point is wrapped in a fail-closed envelope. A malformed
//! context, an out-of-domain policy, or a panic anywhere in evaluation yields
//! a disallowed decision flagged [`MODULATE_EXCEPTION`]; nothing propagates to
//! the caller.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dmc_types::{FinalDecision, MismatchInfo, Proposal};
use tracing::{debug, warn};

use crate::context::{ContextMap, GuardContext};
use crate::error::{ModulateError, Result};
use crate::guards::{GuardName, GuardResult, ReasonCode, GUARD_ORDER, MODULATE_EXCEPTION};
use crate::hook::{resolve_policy, PolicyOverride};
use crate::policy::GuardPolicy;

/// Verdict of a single evaluation, without the decision payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModulationOutcome {
    /// Every guard passed
    Passed,
    /// The first failing guard and its reason
    Overridden { guard: GuardName, reason: ReasonCode },
}

impl ModulationOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, ModulationOutcome::Passed)
    }
}

/// Guard pipeline with an optional policy override hook.
///
/// Stateless between calls; share freely across threads.
#[derive(Clone, Default)]
pub struct Modulator {
    policy_override: Option<Arc<dyn PolicyOverride>>,
}

impl fmt::Debug for Modulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modulator")
            .field(
                "policy_override",
                &self.policy_override.as_ref().map(|hook| hook.name().to_string()),
            )
            .finish()
    }
}

impl Modulator {
    /// A modulator without an override hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a policy override hook.
    pub fn with_override(self, hook: impl PolicyOverride + 'static) -> Self {
        self.with_shared_override(Arc::new(hook))
    }

    /// Install a hook that is shared with other modulators.
    pub fn with_shared_override(mut self, hook: Arc<dyn PolicyOverride>) -> Self {
        self.policy_override = Some(hook);
        self
    }

    pub fn has_override(&self) -> bool {
        self.policy_override.is_some()
    }

    /// Modulate `proposal` against an untyped context map.
    pub fn modulate(
        &self,
        proposal: &Proposal,
        policy: &GuardPolicy,
        context: &ContextMap,
    ) -> (FinalDecision, MismatchInfo) {
        let result = catch_unwind(AssertUnwindSafe(|| -> Result<(FinalDecision, MismatchInfo)> {
            let context = GuardContext::from_map(context)?;
            self.decide(proposal, policy, &context)
        }));
        contain(result, policy)
    }

    /// Modulate `proposal` against an already-typed context.
    pub fn modulate_context(
        &self,
        proposal: &Proposal,
        policy: &GuardPolicy,
        context: &GuardContext,
    ) -> (FinalDecision, MismatchInfo) {
        let result = catch_unwind(AssertUnwindSafe(|| self.decide(proposal, policy, context)));
        contain(result, policy)
    }

    /// Run the guards and report only the verdict.
    ///
    /// Unlike [`Modulator::modulate`], unexpected errors are returned rather
    /// than folded into a decision.
    pub fn evaluate(&self, policy: &GuardPolicy, context: &GuardContext) -> Result<ModulationOutcome> {
        let result = catch_unwind(AssertUnwindSafe(|| -> Result<ModulationOutcome> {
            context.validate()?;
            let effective = resolve_policy(self.policy_override.as_deref(), policy, context);
            effective.validate()?;
            Ok(match run_guards(context, &effective) {
                None => ModulationOutcome::Passed,
                Some((guard, reason)) => ModulationOutcome::Overridden { guard, reason },
            })
        }));
        result.unwrap_or_else(|payload| Err(ModulateError::Panicked(panic_message(payload.as_ref()))))
    }

    fn decide(
        &self,
        proposal: &Proposal,
        policy: &GuardPolicy,
        context: &GuardContext,
    ) -> Result<(FinalDecision, MismatchInfo)> {
        context.validate()?;
        let effective = resolve_policy(self.policy_override.as_deref(), policy, context);
        effective.validate()?;

        let Some((guard, reason)) = run_guards(context, &effective) else {
            return Ok((FinalDecision::pass_through(proposal), MismatchInfo::none()));
        };

        let action = effective.effective_fail_closed_action();
        let mut mismatch = MismatchInfo::single(guard.as_str(), reason.as_str());
        if guard == GuardName::RateLimit {
            mismatch = mismatch.with_throttle_refresh_ms(effective.throttle_refresh_ms);
        }
        warn!(
            guard = %guard,
            code = %reason,
            proposed = %proposal.action,
            action = %action,
            "Proposal overridden"
        );
        Ok((FinalDecision::overridden(action, &mismatch), mismatch))
    }
}

/// Modulate with a hook-less [`Modulator`].
pub fn modulate(
    proposal: &Proposal,
    policy: &GuardPolicy,
    context: &ContextMap,
) -> (FinalDecision, MismatchInfo) {
    Modulator::new().modulate(proposal, policy, context)
}

/// First failing guard in [`GUARD_ORDER`], if any.
fn run_guards(context: &GuardContext, policy: &GuardPolicy) -> Option<(GuardName, ReasonCode)> {
    for guard in GUARD_ORDER {
        let result = guard.evaluate(context, policy);
        debug!(guard = %guard, pass = result.is_pass(), "Guard evaluated");
        if let GuardResult::Fail(reason) = result {
            return Some((guard, reason));
        }
    }
    None
}

fn contain(
    result: std::thread::Result<Result<(FinalDecision, MismatchInfo)>>,
    policy: &GuardPolicy,
) -> (FinalDecision, MismatchInfo) {
    let error = match result {
        Ok(Ok(decision)) => return decision,
        Ok(Err(error)) => error,
        Err(payload) => ModulateError::Panicked(panic_message(payload.as_ref())),
    };

    let action = policy.effective_fail_closed_action();
    warn!(
        kind = error.kind(),
        error = %error,
        action = %action,
        "Modulation failed, failing closed"
    );
    let mismatch = MismatchInfo::single(MODULATE_EXCEPTION, error.kind());
    (FinalDecision::overridden(action, &mismatch), mismatch)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OverrideError;
    use dmc_types::Action;
    use serde_json::json;

    fn ctx(value: serde_json::Value) -> ContextMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!("test contexts are objects"),
        }
    }

    fn proposal() -> Proposal {
        Proposal::new(Action::Act, 0.9).with_reason("signal")
    }

    #[test]
    fn passes_through_when_all_guards_pass() {
        let (decision, mismatch) = modulate(
            &proposal(),
            &GuardPolicy::default(),
            &ctx(json!({ "now_ms": 1_000 })),
        );
        assert!(decision.allowed);
        assert_eq!(decision.action, Action::Act);
        assert_eq!(decision.reasons, vec!["signal".to_string()]);
        assert!(mismatch.is_empty());
    }

    #[test]
    fn first_failure_wins() {
        let context = ctx(json!({
            "now_ms": 10_000,
            "last_event_ts_ms": 0,
            "recent_failures": 99,
            "cooldown_until_ms": 20_000,
        }));
        let (decision, mismatch) = modulate(&proposal(), &GuardPolicy::default(), &context);
        assert!(!decision.allowed);
        assert_eq!(decision.action, Action::Hold);
        assert_eq!(mismatch.flags, vec!["staleness"]);
        assert_eq!(mismatch.reason_codes, vec!["staleness_exceeded"]);
        assert_eq!(decision.reasons, mismatch.reason_codes);
    }

    #[test]
    fn rate_limit_attaches_throttle_hint() {
        let context = ctx(json!({ "rate_limit_events": 11 }));
        let (_, mismatch) = modulate(&proposal(), &GuardPolicy::default(), &context);
        assert_eq!(mismatch.flags, vec!["rate_limit"]);
        assert_eq!(mismatch.throttle_refresh_ms, Some(1_500));

        let context = ctx(json!({ "recent_failures": 5 }));
        let (_, mismatch) = modulate(&proposal(), &GuardPolicy::default(), &context);
        assert_eq!(mismatch.throttle_refresh_ms, None);
    }

    #[test]
    fn fail_closed_action_is_normalized() {
        let policy = GuardPolicy::default().with_fail_closed_action(Action::Flatten);
        let context = ctx(json!({ "ops_deny_actions": true }));
        let (decision, _) = modulate(&proposal(), &policy, &context);
        assert_eq!(decision.action, Action::Hold);

        let policy = GuardPolicy::default().with_fail_closed_action(Action::Stop);
        let (decision, _) = modulate(&proposal(), &policy, &context);
        assert_eq!(decision.action, Action::Stop);
    }

    #[test]
    fn malformed_context_fails_closed() {
        let context = ctx(json!({ "now_ms": 1_000, "last_event_ts_ms": "not_an_int" }));
        let (decision, mismatch) = modulate(&proposal(), &GuardPolicy::default(), &context);
        assert!(!decision.allowed);
        assert_eq!(decision.action, Action::Hold);
        assert_eq!(mismatch.flags, vec![MODULATE_EXCEPTION]);
        assert_eq!(mismatch.reason_codes, vec!["invalid_context"]);
    }

    #[test]
    fn float_valued_numbers_are_numbers() {
        let policy = GuardPolicy::default().with_staleness_ms(1_000);
        let context = ctx(json!({ "now_ms": 1500.0, "last_event_ts_ms": 1000.0 }));
        let (decision, mismatch) = modulate(&proposal(), &policy, &context);
        assert!(decision.allowed);
        assert!(mismatch.is_empty());

        let context = ctx(json!({ "now_ms": 1500, "recent_failures": 1.0 }));
        let (decision, _) = modulate(&proposal(), &policy, &context);
        assert!(decision.allowed);

        let context = ctx(json!({ "now_ms": 10000.0, "last_event_ts_ms": 1000.0 }));
        let (decision, mismatch) = modulate(&proposal(), &policy, &context);
        assert!(!decision.allowed);
        assert_eq!(mismatch.flags, vec!["staleness"]);
        assert_eq!(mismatch.reason_codes, vec!["staleness_exceeded"]);
    }

    #[test]
    fn non_finite_typed_context_fails_closed() {
        let context = GuardContext {
            recent_failures: f64::NAN,
            ..GuardContext::at(0)
        };
        let (decision, mismatch) =
            Modulator::new().modulate_context(&proposal(), &GuardPolicy::default(), &context);
        assert!(!decision.allowed);
        assert_eq!(mismatch.reason_codes, vec!["invalid_context"]);

        let err = Modulator::new()
            .evaluate(&GuardPolicy::default(), &context)
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_context");
    }

    #[test]
    fn invalid_policy_fails_closed() {
        let policy = GuardPolicy::default()
            .with_staleness_ms(-5)
            .with_fail_closed_action(Action::Stop);
        let (decision, mismatch) = modulate(&proposal(), &policy, &ContextMap::new());
        assert_eq!(decision.action, Action::Stop);
        assert_eq!(mismatch.reason_codes, vec!["invalid_policy"]);
    }

    #[test]
    fn negative_limit_reports_invalid_policy_not_rate_limit() {
        let policy = GuardPolicy::default().with_rate_limit(-1, 60_000);
        let (decision, mismatch) = modulate(&proposal(), &policy, &ctx(json!({ "now_ms": 0 })));
        assert!(!decision.allowed);
        assert_eq!(mismatch.flags, vec![MODULATE_EXCEPTION]);
        assert_eq!(mismatch.reason_codes, vec!["invalid_policy"]);
        assert_eq!(mismatch.throttle_refresh_ms, None);
    }

    #[test]
    fn hook_adjusts_thresholds() {
        let modulator = Modulator::new().with_override(
            |base: &GuardPolicy, _: &GuardContext| -> std::result::Result<GuardPolicy, OverrideError> {
                Ok(base.clone().with_staleness_ms(100))
            },
        );
        assert!(modulator.has_override());

        let context = GuardContext::at(1_000).with_last_event(800);
        let (decision, mismatch) =
            modulator.modulate_context(&proposal(), &GuardPolicy::default(), &context);
        assert!(!decision.allowed);
        assert_eq!(mismatch.flags, vec!["staleness"]);

        let (decision, _) = Modulator::new().modulate_context(&proposal(), &GuardPolicy::default(), &context);
        assert!(decision.allowed);
    }

    #[test]
    fn evaluate_reports_verdict() {
        let modulator = Modulator::new();
        let policy = GuardPolicy::default();

        let outcome = modulator.evaluate(&policy, &GuardContext::at(0)).unwrap();
        assert!(outcome.is_passed());

        let outcome = modulator
            .evaluate(&policy, &GuardContext::at(0).with_cooldown_until(10))
            .unwrap();
        assert_eq!(
            outcome,
            ModulationOutcome::Overridden {
                guard: GuardName::Cooldown,
                reason: ReasonCode::CooldownActive,
            }
        );

        let err = modulator
            .evaluate(&policy.with_cooldown_ms(-1), &GuardContext::at(0))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_policy");
    }

    #[test]
    fn panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn debug_shows_hook_name() {
        let modulator = Modulator::new();
        assert!(format!("{modulator:?}").contains("None"));
    }
}
