use std::fmt;
use std::sync::Arc;

use dmc_types::{Action, FinalDecision, MismatchInfo, Proposal};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::guards::{
    adverse_selection_guard, adverse_selection_ticks_guard, cancel_rate_guard, cost_guard,
    daily_loss_guard, exposure_guard, inventory_guard, liquidity_guard, sigma_spike_guard,
    spread_guard,
};
use super::policy::RiskPolicy;
use crate::context::{finite, finite_opt, ContextMap};
use crate::error::{ContextError, ModulateError};
use crate::guards::{
    circuit_breaker_guard, error_rate_guard, ops_health_guard, staleness_guard, GuardResult,
    MODULATE_EXCEPTION,
};
use crate::hook::{resolve_policy, PolicyOverride};

/// Market-making context. Missing keys take the defaults below; numeric keys
/// accept any JSON number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyContext {
    pub now_ms: f64,
    pub last_event_ts_ms: Option<f64>,
    pub depth: f64,
    pub spread_bps: f64,
    pub current_total_exposure_usd: f64,
    pub abs_inventory: f64,
    pub cancels_in_window: f64,
    pub daily_realized_pnl_usd: f64,
    pub errors_in_window: f64,
    /// Defaults to 1 so a bare error count is still rated
    pub steps_in_window: f64,
    pub recent_failures: f64,
    pub adverse_selection_avg: f64,
    pub adverse_15_ticks: Option<f64>,
    pub adverse_60_ticks: Option<f64>,
    pub sigma_spike_z: f64,
    pub tp_ticks: f64,
    pub ops_deny_actions: Option<bool>,
    pub ops_state: Option<String>,
    pub ops_cooldown_until_ms: Option<f64>,
}

impl Default for LegacyContext {
    fn default() -> Self {
        Self {
            now_ms: 0.0,
            last_event_ts_ms: None,
            depth: 0.0,
            spread_bps: 0.0,
            current_total_exposure_usd: 0.0,
            abs_inventory: 0.0,
            cancels_in_window: 0.0,
            daily_realized_pnl_usd: 0.0,
            errors_in_window: 0.0,
            steps_in_window: 1.0,
            recent_failures: 0.0,
            adverse_selection_avg: 0.0,
            adverse_15_ticks: None,
            adverse_60_ticks: None,
            sigma_spike_z: 0.0,
            tp_ticks: 1.0,
            ops_deny_actions: None,
            ops_state: None,
            ops_cooldown_until_ms: None,
        }
    }
}

impl LegacyContext {
    pub fn from_map(map: &ContextMap) -> Result<Self, ContextError> {
        let context: Self = serde_json::from_value(Value::Object(map.clone()))?;
        context.validate()?;
        Ok(context)
    }

    /// Every numeric field must be finite.
    pub fn validate(&self) -> Result<(), ContextError> {
        for (field, value) in [
            ("now_ms", self.now_ms),
            ("depth", self.depth),
            ("spread_bps", self.spread_bps),
            ("current_total_exposure_usd", self.current_total_exposure_usd),
            ("abs_inventory", self.abs_inventory),
            ("cancels_in_window", self.cancels_in_window),
            ("daily_realized_pnl_usd", self.daily_realized_pnl_usd),
            ("errors_in_window", self.errors_in_window),
            ("steps_in_window", self.steps_in_window),
            ("recent_failures", self.recent_failures),
            ("adverse_selection_avg", self.adverse_selection_avg),
            ("sigma_spike_z", self.sigma_spike_z),
            ("tp_ticks", self.tp_ticks),
        ] {
            finite(field, value)?;
        }
        finite_opt("last_event_ts_ms", self.last_event_ts_ms)?;
        finite_opt("adverse_15_ticks", self.adverse_15_ticks)?;
        finite_opt("adverse_60_ticks", self.adverse_60_ticks)?;
        finite_opt("ops_cooldown_until_ms", self.ops_cooldown_until_ms)
    }
}

/// A failed legacy check: flag, reason code and the substituted action.
struct Trip {
    flag: &'static str,
    code: &'static str,
    action: Action,
}

fn check<R>(
    result: GuardResult<R>,
    flag: &'static str,
    action: Action,
    code: impl Fn(&R) -> &'static str,
) -> Option<Trip> {
    result.reason().map(|reason| Trip {
        flag,
        code: code(reason),
        action,
    })
}

/// Market-making pipeline with an optional [`RiskPolicy`] override hook.
///
/// Unlike [`crate::Modulator`], each guard carries its own override action:
/// ops-health, daily loss and the circuit breaker stop; exposure and inventory
/// flatten; everything else holds. A passing `Quote` has its size clamped to
/// `max_per_market_usd`.
#[derive(Clone, Default)]
pub struct LegacyModulator {
    policy_override: Option<Arc<dyn PolicyOverride<RiskPolicy, LegacyContext>>>,
}

impl fmt::Debug for LegacyModulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyModulator")
            .field(
                "policy_override",
                &self.policy_override.as_ref().map(|hook| hook.name().to_string()),
            )
            .finish()
    }
}

impl LegacyModulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a hook that may adjust the [`RiskPolicy`] per call. Hook
    /// errors, panics and invalid output fall back to the base policy.
    pub fn with_override(mut self, hook: impl PolicyOverride<RiskPolicy, LegacyContext> + 'static) -> Self {
        self.policy_override = Some(Arc::new(hook));
        self
    }

    pub fn modulate(
        &self,
        proposal: &Proposal,
        policy: &RiskPolicy,
        context: &ContextMap,
    ) -> (FinalDecision, MismatchInfo) {
        match LegacyContext::from_map(context) {
            Ok(context) => self.modulate_context(proposal, policy, &context),
            Err(e) => fail_closed(ModulateError::from(e)),
        }
    }

    /// [`LegacyModulator::modulate`] with an already-typed context.
    pub fn modulate_context(
        &self,
        proposal: &Proposal,
        policy: &RiskPolicy,
        context: &LegacyContext,
    ) -> (FinalDecision, MismatchInfo) {
        if let Err(e) = context.validate() {
            return fail_closed(ModulateError::from(e));
        }
        let policy = resolve_policy(self.policy_override.as_deref(), policy, context);
        if let Err(e) = policy.validate() {
            return fail_closed(ModulateError::from(e));
        }

        if proposal.action == Action::Flatten && context.abs_inventory == 0.0 {
            let mismatch = MismatchInfo::single("flatten_no_position", "no_inventory_to_flatten");
            return (FinalDecision::overridden(Action::Hold, &mismatch), mismatch);
        }

        if let Some(trip) = first_trip(&policy, context) {
            let mut mismatch = MismatchInfo::single(trip.flag, trip.code);
            if trip.flag == "cancel_rate" {
                mismatch = mismatch.with_throttle_refresh_ms(policy.throttle_refresh_ms);
            }
            warn!(
                guard = trip.flag,
                code = trip.code,
                proposed = %proposal.action,
                action = %trip.action,
                "Proposal overridden by legacy guard"
            );
            return (FinalDecision::overridden(trip.action, &mismatch), mismatch);
        }

        let action = match &proposal.action {
            Action::Quote(params) => {
                let mut params = params.clone();
                params.size_usd = params.size_usd.map(|size| size.min(policy.max_per_market_usd));
                Action::Quote(params)
            }
            other => other.clone(),
        };
        (
            FinalDecision::allow(action, proposal.reasons.clone()),
            MismatchInfo::none(),
        )
    }
}

/// Modulate a proposal with the market-making profile and no override hook.
pub fn modulate(
    proposal: &Proposal,
    policy: &RiskPolicy,
    context: &ContextMap,
) -> (FinalDecision, MismatchInfo) {
    LegacyModulator::new().modulate(proposal, policy, context)
}

/// [`modulate`] with an already-typed context.
pub fn modulate_context(
    proposal: &Proposal,
    policy: &RiskPolicy,
    context: &LegacyContext,
) -> (FinalDecision, MismatchInfo) {
    LegacyModulator::new().modulate_context(proposal, policy, context)
}

fn first_trip(policy: &RiskPolicy, ctx: &LegacyContext) -> Option<Trip> {
    let generic = |r: &crate::guards::ReasonCode| r.as_str();
    let legacy = |r: &super::guards::LegacyReason| r.as_str();
    let last_event = ctx.last_event_ts_ms.unwrap_or(ctx.now_ms);

    let adverse = match (ctx.adverse_15_ticks, ctx.adverse_60_ticks) {
        (Some(adv15), Some(adv60)) => {
            adverse_selection_ticks_guard(adv15, adv60, policy.adv15_max_ticks, policy.adv60_max_ticks)
        }
        _ => adverse_selection_guard(ctx.adverse_selection_avg, policy.adverse_selection_max),
    };

    check(
        ops_health_guard(
            ctx.ops_deny_actions,
            ctx.ops_state.as_deref(),
            ctx.ops_cooldown_until_ms,
            ctx.now_ms,
        ),
        "ops_health",
        Action::Stop,
        generic,
    )
    .or_else(|| {
        check(
            staleness_guard(last_event, ctx.now_ms, policy.staleness_ms),
            "staleness",
            Action::Hold,
            generic,
        )
    })
    .or_else(|| check(liquidity_guard(ctx.depth, policy.min_depth), "liquidity", Action::Hold, legacy))
    .or_else(|| check(spread_guard(ctx.spread_bps, policy.max_spread_bps), "spread", Action::Hold, legacy))
    .or_else(|| {
        check(
            exposure_guard(ctx.current_total_exposure_usd, policy.max_total_exposure_usd),
            "exposure",
            Action::Flatten,
            legacy,
        )
    })
    .or_else(|| {
        check(
            inventory_guard(ctx.abs_inventory, policy.max_abs_inventory),
            "inventory",
            Action::Flatten,
            legacy,
        )
    })
    .or_else(|| {
        check(
            cancel_rate_guard(ctx.cancels_in_window, policy.cancel_rate_limit),
            "cancel_rate",
            Action::Hold,
            legacy,
        )
    })
    .or_else(|| {
        check(
            daily_loss_guard(ctx.daily_realized_pnl_usd, policy.daily_loss_stop_usd),
            "daily_loss",
            Action::Stop,
            legacy,
        )
    })
    .or_else(|| {
        check(
            error_rate_guard(ctx.errors_in_window, ctx.steps_in_window, policy.error_rate_max),
            "error_rate",
            Action::Hold,
            generic,
        )
    })
    .or_else(|| {
        check(
            circuit_breaker_guard(ctx.recent_failures, policy.circuit_breaker_failures),
            "circuit_breaker",
            Action::Stop,
            generic,
        )
    })
    .or_else(|| check(adverse, "adverse_selection", Action::Hold, legacy))
    .or_else(|| {
        check(
            sigma_spike_guard(ctx.sigma_spike_z, policy.sigma_spike_z_max),
            "sigma_spike",
            Action::Hold,
            legacy,
        )
    })
    .or_else(|| {
        check(
            cost_guard(ctx.tp_ticks, policy.cost_ticks, policy.min_profit_ticks),
            "cost",
            Action::Hold,
            legacy,
        )
    })
}

fn fail_closed(error: ModulateError) -> (FinalDecision, MismatchInfo) {
    warn!(kind = error.kind(), error = %error, "Legacy modulation failed, holding");
    let mismatch = MismatchInfo::single(MODULATE_EXCEPTION, error.kind());
    (FinalDecision::overridden(Action::Hold, &mismatch), mismatch)
}
