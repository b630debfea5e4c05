//! Market-making guards. Each returns [`GuardResult<LegacyReason>`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::guards::GuardResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyReason {
    LiquidityLow,
    SpreadWide,
    ExposureCap,
    InventoryCap,
    CancelRateThrottle,
    DailyLossStop,
    AdverseSelectionHigh,
    #[serde(rename = "adverse_selection_high_15")]
    AdverseSelectionHigh15,
    #[serde(rename = "adverse_selection_high_60")]
    AdverseSelectionHigh60,
    SigmaSpike,
    CostInsufficient,
}

impl LegacyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegacyReason::LiquidityLow => "liquidity_low",
            LegacyReason::SpreadWide => "spread_wide",
            LegacyReason::ExposureCap => "exposure_cap",
            LegacyReason::InventoryCap => "inventory_cap",
            LegacyReason::CancelRateThrottle => "cancel_rate_throttle",
            LegacyReason::DailyLossStop => "daily_loss_stop",
            LegacyReason::AdverseSelectionHigh => "adverse_selection_high",
            LegacyReason::AdverseSelectionHigh15 => "adverse_selection_high_15",
            LegacyReason::AdverseSelectionHigh60 => "adverse_selection_high_60",
            LegacyReason::SigmaSpike => "sigma_spike",
            LegacyReason::CostInsufficient => "cost_insufficient",
        }
    }
}

impl fmt::Display for LegacyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn fail_if(condition: bool, reason: LegacyReason) -> GuardResult<LegacyReason> {
    if condition {
        GuardResult::Fail(reason)
    } else {
        GuardResult::Pass
    }
}

pub fn liquidity_guard(depth: f64, min_depth: f64) -> GuardResult<LegacyReason> {
    fail_if(depth < min_depth, LegacyReason::LiquidityLow)
}

pub fn spread_guard(spread_bps: f64, max_spread_bps: f64) -> GuardResult<LegacyReason> {
    fail_if(spread_bps > max_spread_bps, LegacyReason::SpreadWide)
}

pub fn exposure_guard(total_exposure_usd: f64, max_total_exposure_usd: f64) -> GuardResult<LegacyReason> {
    fail_if(total_exposure_usd > max_total_exposure_usd, LegacyReason::ExposureCap)
}

pub fn inventory_guard(abs_inventory: f64, max_abs_inventory: f64) -> GuardResult<LegacyReason> {
    fail_if(abs_inventory > max_abs_inventory, LegacyReason::InventoryCap)
}

/// Throttle once cancels reach the limit.
pub fn cancel_rate_guard(cancels_in_window: f64, cancel_rate_limit: i64) -> GuardResult<LegacyReason> {
    fail_if(cancels_in_window >= cancel_rate_limit as f64, LegacyReason::CancelRateThrottle)
}

/// Stop once realized PnL reaches `-|daily_loss_stop_usd|`.
pub fn daily_loss_guard(daily_realized_pnl_usd: f64, daily_loss_stop_usd: f64) -> GuardResult<LegacyReason> {
    fail_if(
        daily_realized_pnl_usd <= -daily_loss_stop_usd.abs(),
        LegacyReason::DailyLossStop,
    )
}

pub fn adverse_selection_guard(avg: f64, max: f64) -> GuardResult<LegacyReason> {
    fail_if(avg > max, LegacyReason::AdverseSelectionHigh)
}

/// Tick-based adverse selection over 15 s and 60 s horizons; 15 s is checked first.
pub fn adverse_selection_ticks_guard(
    adv15_ticks: f64,
    adv60_ticks: f64,
    max15_ticks: f64,
    max60_ticks: f64,
) -> GuardResult<LegacyReason> {
    if adv15_ticks > max15_ticks {
        return GuardResult::Fail(LegacyReason::AdverseSelectionHigh15);
    }
    fail_if(adv60_ticks > max60_ticks, LegacyReason::AdverseSelectionHigh60)
}

pub fn sigma_spike_guard(z: f64, z_max: f64) -> GuardResult<LegacyReason> {
    fail_if(z > z_max, LegacyReason::SigmaSpike)
}

/// Take-profit must cover `ceil(cost + min_profit)` ticks.
pub fn cost_guard(tp_ticks: f64, cost_ticks: f64, min_profit_ticks: f64) -> GuardResult<LegacyReason> {
    let required = (cost_ticks + min_profit_ticks).ceil();
    fail_if(tp_ticks < required, LegacyReason::CostInsufficient)
}
