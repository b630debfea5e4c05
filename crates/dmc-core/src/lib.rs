//! Decision Modulation Core: a fail-closed guard pipeline.
//!
//! Sits between a decision engine and an executor. Given a [`Proposal`], a
//! [`GuardPolicy`] and a per-call context, it either lets the proposal through
//! unchanged or overrides it to a safe action (`HOLD` or `STOP`) with a stable
//! reason code.
//!
//! ## Guarantees
//!
//! - **Fixed order**: guards run in [`GUARD_ORDER`]; the first failure decides.
//! - **Fail closed**: a guard failure, malformed context, invalid policy or
//!   panic yields `allowed = false` with a `HOLD`/`STOP` action. Nothing
//!   propagates out of [`modulate`].
//! - **Stateless**: no component keeps state between calls; a [`Modulator`] can
//!   be shared across threads.
//! - **Isolated hook**: a [`PolicyOverride`] may adjust thresholds per call, but
//!   its failures only ever fall back to the base policy.
//!
//! ## Pipeline
//!
//! 1. **ops_health**: operational deny flag, `RED` state, ops cooldown
//! 2. **staleness**: last event too old
//! 3. **error_rate**: errors per step above threshold
//! 4. **rate_limit**: events in window above limit
//! 5. **circuit_breaker**: recent failures at threshold
//! 6. **cooldown**: generic cooldown still active
//!
//! ## Also here
//!
//! - [`legacy`]: market-making profile with per-guard override actions
//! - [`gating`]: live-execution gate (mode, flag, env, kill switch)
//! - [`metrics`]: drawdown, returns, adverse selection
//! - [`compat`]: version and deprecation diagnostics

mod config;

pub mod compat;
pub mod context;
pub mod error;
pub mod gating;
pub mod guards;
pub mod hook;
pub mod legacy;
pub mod metrics;
pub mod modulator;
pub mod policy;

pub use context::{now_ms, ContextMap, GuardContext};
pub use error::{ConfigError, ContextError, ModulateError, OverrideError, PolicyError, Result};
pub use gating::{live_execution_allowed, GatingReason, LiveGatingRequest, LiveGatingResult};
pub use guards::{
    GuardName, GuardResult, ReasonCode, GUARD_ORDER, GUARD_ORDER_VERSION, MODULATE_EXCEPTION,
};
pub use hook::{OverridablePolicy, PolicyOverride};
pub use modulator::{modulate, ModulationOutcome, Modulator};
pub use policy::GuardPolicy;

// Schema re-exports, deprecated from 0.3.0 (see `compat`).
pub use dmc_types::{Action, DecisionPacket, FinalDecision, MismatchInfo, Proposal, QuoteParams};
