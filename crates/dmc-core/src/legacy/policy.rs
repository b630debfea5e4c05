use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{ConfigError, PolicyError};

/// Thresholds for the market-making profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    pub staleness_ms: i64,
    /// Minimum book depth
    pub min_depth: f64,
    pub max_spread_bps: f64,
    /// Quote size cap applied on pass-through
    pub max_per_market_usd: f64,
    pub max_total_exposure_usd: f64,
    pub max_abs_inventory: f64,
    /// Cancels per window that trigger throttling (inclusive bound)
    pub cancel_rate_limit: i64,
    pub cancel_window_ms: i64,
    /// Realized loss that stops trading for the day
    pub daily_loss_stop_usd: f64,
    pub error_rate_max: f64,
    pub circuit_breaker_failures: i64,
    /// Refresh hint attached when cancels are throttled (ms)
    pub throttle_refresh_ms: u64,
    /// Maximum average adverse move after fills (mid units)
    pub adverse_selection_max: f64,
    pub adv15_max_ticks: f64,
    pub adv60_max_ticks: f64,
    pub sigma_spike_z_max: f64,
    pub cost_ticks: f64,
    pub min_profit_ticks: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            staleness_ms: 1_000,
            min_depth: 1.0,
            max_spread_bps: 500.0,
            max_per_market_usd: 5.0,
            max_total_exposure_usd: 10.0,
            max_abs_inventory: 10.0,
            cancel_rate_limit: 20,
            cancel_window_ms: 10_000,
            daily_loss_stop_usd: 2.5,
            error_rate_max: 0.1,
            circuit_breaker_failures: 5,
            throttle_refresh_ms: 1_500,
            adverse_selection_max: 0.005,
            adv15_max_ticks: 1.0,
            adv60_max_ticks: 2.0,
            sigma_spike_z_max: 2.5,
            cost_ticks: 1.0,
            min_profit_ticks: 0.0,
        }
    }
}

impl RiskPolicy {
    /// Same domain rules as [`crate::GuardPolicy::validate`]: out-of-domain
    /// thresholds fail the call as `invalid_policy`.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (field, value) in [
            ("staleness_ms", self.staleness_ms),
            ("cancel_rate_limit", self.cancel_rate_limit),
            ("cancel_window_ms", self.cancel_window_ms),
            ("circuit_breaker_failures", self.circuit_breaker_failures),
        ] {
            if value < 0 {
                return Err(PolicyError::Negative {
                    field,
                    value: value.to_string(),
                });
            }
        }
        for (field, value) in [
            ("min_depth", self.min_depth),
            ("max_spread_bps", self.max_spread_bps),
            ("max_per_market_usd", self.max_per_market_usd),
            ("max_total_exposure_usd", self.max_total_exposure_usd),
            ("max_abs_inventory", self.max_abs_inventory),
            ("daily_loss_stop_usd", self.daily_loss_stop_usd),
            ("error_rate_max", self.error_rate_max),
            ("adverse_selection_max", self.adverse_selection_max),
            ("adv15_max_ticks", self.adv15_max_ticks),
            ("adv60_max_ticks", self.adv60_max_ticks),
            ("sigma_spike_z_max", self.sigma_spike_z_max),
            ("cost_ticks", self.cost_ticks),
            ("min_profit_ticks", self.min_profit_ticks),
        ] {
            if !value.is_finite() {
                return Err(PolicyError::NotFinite { field, value });
            }
            if value < 0.0 {
                return Err(PolicyError::Negative {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let policy: Self = config::from_toml_str(content)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let policy: Self = config::read_toml_file(path)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        config::to_toml_string(self)
    }
}
