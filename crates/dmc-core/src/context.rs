//! Guard evaluation context.
//!
//! Callers hand the modulator a string-keyed JSON map ([`ContextMap`]). It is
//! projected exactly once into [`GuardContext`]; guards only ever see the typed
//! record. A key holding a value of the wrong type fails the projection, and
//! the modulator turns that failure into a fail-closed decision.
//!
//! | key | default |
//! |---|---|
//! | `now_ms` | `0` |
//! | `last_event_ts_ms` | `now_ms` |
//! | `ops_deny_actions`, `ops_state`, `ops_cooldown_until_ms` | unset |
//! | `errors_in_window` | `0` |
//! | `steps_in_window` | `0` (error-rate guard passes) |
//! | `rate_limit_events`, `recent_failures` | `0` |
//! | `cooldown_until_ms` | unset |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ContextError;

/// Untyped context as received at the boundary.
pub type ContextMap = Map<String, Value>;

/// Health state that denies every action.
pub const OPS_STATE_RED: &str = "RED";

/// Typed, fully optional guard context.
///
/// Times and counters accept any JSON number; `1500` and `1500.0` read the
/// same. Builders take whole milliseconds and counts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardContext {
    /// Current time (ms)
    pub now_ms: f64,
    /// Time of the last observed event (ms); `None` means "now"
    pub last_event_ts_ms: Option<f64>,
    /// Explicit deny flag from the ops-health layer
    pub ops_deny_actions: Option<bool>,
    /// Ops-health state ("GREEN", "YELLOW", "RED")
    pub ops_state: Option<String>,
    /// Ops-health cooldown expiry (ms)
    pub ops_cooldown_until_ms: Option<f64>,
    pub errors_in_window: f64,
    pub steps_in_window: f64,
    /// Events counted in the current rate-limit window
    pub rate_limit_events: f64,
    pub recent_failures: f64,
    /// Generic cooldown expiry (ms)
    pub cooldown_until_ms: Option<f64>,
}

impl GuardContext {
    /// Empty context observed at `now_ms`.
    pub fn at(now_ms: i64) -> Self {
        Self {
            now_ms: now_ms as f64,
            ..Self::default()
        }
    }

    /// Empty context observed at the current wall-clock time.
    pub fn now() -> Self {
        Self::at(now_ms())
    }

    /// Project an untyped context map.
    pub fn from_map(map: &ContextMap) -> Result<Self, ContextError> {
        let context: Self = serde_json::from_value(Value::Object(map.clone()))?;
        context.validate()?;
        Ok(context)
    }

    /// Every numeric field must be finite. A NaN would make each comparison
    /// false and let its guard pass.
    pub fn validate(&self) -> Result<(), ContextError> {
        finite("now_ms", self.now_ms)?;
        finite_opt("last_event_ts_ms", self.last_event_ts_ms)?;
        finite_opt("ops_cooldown_until_ms", self.ops_cooldown_until_ms)?;
        finite("errors_in_window", self.errors_in_window)?;
        finite("steps_in_window", self.steps_in_window)?;
        finite("rate_limit_events", self.rate_limit_events)?;
        finite("recent_failures", self.recent_failures)?;
        finite_opt("cooldown_until_ms", self.cooldown_until_ms)
    }

    /// Back to the boundary representation.
    pub fn to_map(&self) -> ContextMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => ContextMap::new(),
        }
    }

    /// Last event time, defaulting to `now_ms` when unset.
    pub fn effective_last_event_ms(&self) -> f64 {
        self.last_event_ts_ms.unwrap_or(self.now_ms)
    }

    pub fn with_last_event(mut self, ts_ms: i64) -> Self {
        self.last_event_ts_ms = Some(ts_ms as f64);
        self
    }

    pub fn with_ops_deny_actions(mut self, deny: bool) -> Self {
        self.ops_deny_actions = Some(deny);
        self
    }

    pub fn with_ops_state(mut self, state: impl Into<String>) -> Self {
        self.ops_state = Some(state.into());
        self
    }

    pub fn with_ops_cooldown_until(mut self, until_ms: i64) -> Self {
        self.ops_cooldown_until_ms = Some(until_ms as f64);
        self
    }

    pub fn with_errors(mut self, errors_in_window: i64, steps_in_window: i64) -> Self {
        self.errors_in_window = errors_in_window as f64;
        self.steps_in_window = steps_in_window as f64;
        self
    }

    pub fn with_rate_limit_events(mut self, events: i64) -> Self {
        self.rate_limit_events = events as f64;
        self
    }

    pub fn with_recent_failures(mut self, failures: i64) -> Self {
        self.recent_failures = failures as f64;
        self
    }

    pub fn with_cooldown_until(mut self, until_ms: i64) -> Self {
        self.cooldown_until_ms = Some(until_ms as f64);
        self
    }
}

impl TryFrom<&ContextMap> for GuardContext {
    type Error = ContextError;

    fn try_from(map: &ContextMap) -> Result<Self, Self::Error> {
        Self::from_map(map)
    }
}

pub(crate) fn finite(field: &'static str, value: f64) -> Result<(), ContextError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ContextError::NotFinite { field, value })
    }
}

pub(crate) fn finite_opt(field: &'static str, value: Option<f64>) -> Result<(), ContextError> {
    value.map_or(Ok(()), |value| finite(field, value))
}

/// Wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
