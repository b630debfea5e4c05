//! Run metrics: drawdown, returns, summary statistics, adverse selection.
//!
//! These feed the *context* of later calls (for example
//! `adverse_selection_avg`); the modulator never calls them itself.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

const WEIGHT_EPSILON: f64 = 1e-12;

/// Largest peak-to-trough drop of an equity curve.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &equity in equity_curve {
        peak = peak.max(equity);
        worst = worst.max(peak - equity);
    }
    worst
}

/// Step-to-step differences of an equity curve.
pub fn returns_from_equity_curve(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve.windows(2).map(|w| w[1] - w[0]).collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub final_equity: f64,
    pub realized_pnl: f64,
    pub max_drawdown: f64,
    pub action_counts: BTreeMap<String, u64>,
    pub avg_latency_ms: f64,
    pub throttle_events: u64,
    pub error_count: u64,
}

pub fn summary_stats(
    equity_curve: &[f64],
    realized_pnl: f64,
    action_counts: BTreeMap<String, u64>,
    latencies_ms: &[u64],
    throttle_events: u64,
    error_count: u64,
) -> SummaryStats {
    let avg_latency_ms = if latencies_ms.is_empty() {
        0.0
    } else {
        latencies_ms.iter().map(|&ms| ms as f64).sum::<f64>() / latencies_ms.len() as f64
    };
    SummaryStats {
        final_equity: equity_curve.last().copied().unwrap_or(0.0),
        realized_pnl,
        max_drawdown: max_drawdown(equity_curve),
        action_counts,
        avg_latency_ms,
        throttle_events,
        error_count,
    }
}

/// Side of a fill. `buy` and `long` are accepted as bid aliases, `sell` and
/// `short` as ask aliases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    #[serde(alias = "buy", alias = "long", alias = "BID", alias = "BUY", alias = "LONG")]
    Bid,
    #[serde(alias = "sell", alias = "short", alias = "ASK", alias = "SELL", alias = "SHORT")]
    Ask,
}

/// Fill indexed by simulation step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepFill {
    pub step: i64,
    #[serde(default)]
    pub side: Side,
    pub mid_fill: f64,
}

/// Mean absolute adverse mid move `horizon_steps` after each fill.
///
/// A fill whose horizon step has no recorded mid counts as zero move.
pub fn adverse_selection_avg(fills: &[StepFill], step_mid: &HashMap<i64, f64>, horizon_steps: i64) -> f64 {
    if fills.is_empty() {
        return 0.0;
    }
    let total: f64 = fills
        .iter()
        .map(|fill| {
            let later = step_mid
                .get(&fill.step.saturating_add(horizon_steps))
                .copied()
                .unwrap_or(fill.mid_fill);
            match fill.side {
                Side::Ask => later - fill.mid_fill,
                Side::Bid => fill.mid_fill - later,
            }
            .abs()
        })
        .sum();
    total / fills.len() as f64
}

/// Fill with a wall-clock timestamp and quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimedFill {
    pub fill_ts_ms: i64,
    pub fill_mid: f64,
    #[serde(default)]
    pub side: Side,
    #[serde(default = "default_qty")]
    pub qty: f64,
}

fn default_qty() -> f64 {
    1.0
}

/// Mid in effect at `ts_ms`: the last sample at or before it, or the first
/// sample when `ts_ms` precedes the series. `mid_series` must be sorted by time.
fn mid_at(ts_ms: i64, mid_series: &[(i64, f64)]) -> f64 {
    let idx = mid_series.partition_point(|&(t, _)| t <= ts_ms);
    match idx.checked_sub(1) {
        Some(i) => mid_series[i].1,
        None => mid_series.first().map_or(0.0, |&(_, mid)| mid),
    }
}

/// Quantity-weighted adverse move in ticks, `horizon_ms` after each fill.
///
/// Only moves against the fill count; favorable moves contribute zero.
pub fn adverse_selection_avg_ticks(
    fills: &[TimedFill],
    mid_series: &[(i64, f64)],
    horizon_ms: i64,
    tick_size: f64,
) -> f64 {
    if fills.is_empty() || tick_size <= 0.0 {
        return 0.0;
    }
    let (weighted, total_qty) = fills.iter().fold((0.0, 0.0), |(weighted, total), fill| {
        let after = mid_at(fill.fill_ts_ms.saturating_add(horizon_ms), mid_series);
        let adverse = match fill.side {
            Side::Bid => (fill.fill_mid - after) / tick_size,
            Side::Ask => (after - fill.fill_mid) / tick_size,
        }
        .max(0.0);
        (weighted + adverse * fill.qty, total + fill.qty)
    });
    weighted / (total_qty + WEIGHT_EPSILON)
}
