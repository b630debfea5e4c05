//! Live-execution gating.
//!
//! Independent of the modulator: callers check this once at the execution
//! boundary before routing any decision to a live venue. Every check fails
//! closed.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Mode string that enables live execution.
pub const LIVE_MODE: &str = "live";

/// Why live execution was allowed or denied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingReason {
    KillSwitchActive,
    ModeNotLive,
    LiveNotEnabled,
    MissingEnvVars,
    Ok,
}

impl GatingReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatingReason::KillSwitchActive => "kill_switch_active",
            GatingReason::ModeNotLive => "mode_not_live",
            GatingReason::LiveNotEnabled => "live_not_enabled",
            GatingReason::MissingEnvVars => "missing_env_vars",
            GatingReason::Ok => "ok",
        }
    }
}

impl fmt::Display for GatingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to [`live_execution_allowed`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveGatingRequest {
    /// Run mode; only `"live"` can pass
    pub mode: String,
    pub enable_live_flag: bool,
    pub required_env_vars_present: bool,
    pub kill_switch_active: bool,
}

impl LiveGatingRequest {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            ..Self::default()
        }
    }

    pub fn with_live_enabled(mut self, enabled: bool) -> Self {
        self.enable_live_flag = enabled;
        self
    }

    pub fn with_env_vars_present(mut self, present: bool) -> Self {
        self.required_env_vars_present = present;
        self
    }

    /// Set `required_env_vars_present` from the process environment.
    pub fn with_required_env_vars(self, names: &[&str]) -> Self {
        self.with_env_vars_present(required_env_vars_present(names))
    }

    pub fn with_kill_switch(mut self, active: bool) -> Self {
        self.kill_switch_active = active;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveGatingResult {
    pub allowed: bool,
    pub reason: GatingReason,
}

impl LiveGatingResult {
    fn deny(reason: GatingReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// Allow live execution only when the kill switch is off, the mode is
/// `"live"`, the live flag is set and the required environment is present.
/// Checked in that order.
pub fn live_execution_allowed(request: &LiveGatingRequest) -> LiveGatingResult {
    let result = if request.kill_switch_active {
        LiveGatingResult::deny(GatingReason::KillSwitchActive)
    } else if request.mode != LIVE_MODE {
        LiveGatingResult::deny(GatingReason::ModeNotLive)
    } else if !request.enable_live_flag {
        LiveGatingResult::deny(GatingReason::LiveNotEnabled)
    } else if !request.required_env_vars_present {
        LiveGatingResult::deny(GatingReason::MissingEnvVars)
    } else {
        LiveGatingResult {
            allowed: true,
            reason: GatingReason::Ok,
        }
    };

    if result.allowed {
        info!("Live execution allowed");
    } else {
        warn!(mode = %request.mode, reason = %result.reason, "Live execution denied");
    }
    result
}

/// Whether every named variable is set to a non-empty value.
pub fn required_env_vars_present(names: &[&str]) -> bool {
    names
        .iter()
        .all(|name| std::env::var_os(name).is_some_and(|value| !value.is_empty()))
}
