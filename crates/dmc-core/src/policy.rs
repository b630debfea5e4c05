//! Guard policy: thresholds for the generic guards plus the fail-closed action.

use std::path::Path;

use dmc_types::Action;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{ConfigError, PolicyError};

/// Thresholds for the generic guards.
///
/// Missing fields in configuration fall back to [`GuardPolicy::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardPolicy {
    /// Maximum age of the last event (ms)
    pub staleness_ms: i64,
    /// Maximum errors / steps ratio
    pub max_error_rate: f64,
    /// Maximum events per rate-limit window (exclusive bound)
    pub rate_limit_events_max: i64,
    /// Rate-limit window length (ms)
    pub rate_limit_window_ms: i64,
    /// Recent failures that trip the breaker (inclusive bound)
    pub circuit_breaker_failures: i64,
    /// Cooldown length armed after a trip (ms)
    pub cooldown_ms: i64,
    /// Refresh hint attached when the rate limit trips (ms)
    pub throttle_refresh_ms: u64,
    /// Action substituted on guard failure or error.
    ///
    /// Only `HOLD` and `STOP` are honored; see [`GuardPolicy::effective_fail_closed_action`].
    pub fail_closed_action: Action,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            staleness_ms: 5_000,
            max_error_rate: 0.1,
            rate_limit_events_max: 10,
            rate_limit_window_ms: 60_000,
            circuit_breaker_failures: 5,
            cooldown_ms: 30_000,
            throttle_refresh_ms: 1_500,
            fail_closed_action: Action::Hold,
        }
    }
}

impl GuardPolicy {
    /// Tight thresholds; failures stop rather than hold.
    pub fn strict() -> Self {
        Self {
            staleness_ms: 1_000,
            max_error_rate: 0.02,
            rate_limit_events_max: 5,
            rate_limit_window_ms: 60_000,
            circuit_breaker_failures: 3,
            cooldown_ms: 120_000,
            throttle_refresh_ms: 5_000,
            fail_closed_action: Action::Stop,
        }
    }

    /// Loose thresholds for simulation and development.
    pub fn permissive() -> Self {
        Self {
            staleness_ms: 60_000,
            max_error_rate: 0.5,
            rate_limit_events_max: 1_000,
            rate_limit_window_ms: 60_000,
            circuit_breaker_failures: 50,
            cooldown_ms: 5_000,
            throttle_refresh_ms: 500,
            fail_closed_action: Action::Hold,
        }
    }

    pub fn with_staleness_ms(mut self, ms: i64) -> Self {
        self.staleness_ms = ms;
        self
    }

    pub fn with_max_error_rate(mut self, rate: f64) -> Self {
        self.max_error_rate = rate;
        self
    }

    pub fn with_rate_limit(mut self, events_max: i64, window_ms: i64) -> Self {
        self.rate_limit_events_max = events_max;
        self.rate_limit_window_ms = window_ms;
        self
    }

    pub fn with_circuit_breaker_failures(mut self, failures: i64) -> Self {
        self.circuit_breaker_failures = failures;
        self
    }

    pub fn with_cooldown_ms(mut self, ms: i64) -> Self {
        self.cooldown_ms = ms;
        self
    }

    pub fn with_fail_closed_action(mut self, action: Action) -> Self {
        self.fail_closed_action = action;
        self
    }

    /// The configured fail-closed action restricted to {Hold, Stop}.
    pub fn effective_fail_closed_action(&self) -> Action {
        self.fail_closed_action.fail_closed()
    }

    /// Expiry of a cooldown armed at `now_ms`.
    pub fn cooldown_until(&self, now_ms: i64) -> i64 {
        now_ms.saturating_add(self.cooldown_ms)
    }

    /// Check every threshold is inside its domain.
    ///
    /// A negative or non-finite threshold is rejected up front rather than
    /// evaluated: `rate_limit_events_max = -1` fails the call as
    /// `invalid_policy` instead of tripping `rate_limit` on every input. Both
    /// fail closed; only the reported flag differs.
    ///
    /// `fail_closed_action` is never rejected here; it is normalized at use.
    pub fn validate(&self) -> Result<(), PolicyError> {
        non_negative("staleness_ms", self.staleness_ms)?;
        if !self.max_error_rate.is_finite() {
            return Err(PolicyError::NotFinite {
                field: "max_error_rate",
                value: self.max_error_rate,
            });
        }
        if self.max_error_rate < 0.0 {
            return Err(PolicyError::Negative {
                field: "max_error_rate",
                value: self.max_error_rate.to_string(),
            });
        }
        non_negative("rate_limit_events_max", self.rate_limit_events_max)?;
        non_negative("rate_limit_window_ms", self.rate_limit_window_ms)?;
        non_negative("circuit_breaker_failures", self.circuit_breaker_failures)?;
        non_negative("cooldown_ms", self.cooldown_ms)?;
        Ok(())
    }

    /// Parse and validate a TOML policy.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let policy: Self = config::from_toml_str(content)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load and validate a TOML policy file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let policy: Self = config::read_toml_file(path)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        config::to_toml_string(self)
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<(), PolicyError> {
    if value < 0 {
        return Err(PolicyError::Negative {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
