//! Market-making guard profile.
//!
//! Kept alongside the generic pipeline for callers that still configure a
//! [`RiskPolicy`]. It reuses the generic ops-health, staleness, error-rate and
//! circuit-breaker guards and adds venue-specific checks (liquidity, spread,
//! exposure, inventory, cancel rate, daily loss, adverse selection, volatility
//! spikes, cost). Unlike the generic modulator, overrides may be `FLATTEN`.
//! A [`LegacyModulator`] accepts the same kind of override hook as the generic
//! one, typed over [`RiskPolicy`] and [`LegacyContext`].

pub mod guards;
pub mod modulator;
pub mod policy;

pub use guards::LegacyReason;
pub use modulator::{modulate, modulate_context, LegacyContext, LegacyModulator};
pub use policy::RiskPolicy;
