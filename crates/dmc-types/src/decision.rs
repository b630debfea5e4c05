//! Proposal in, decision out.

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// An engine's proposed action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub action: Action,
    /// Engine confidence, nominally in [0, 1]
    pub confidence: f64,
    /// Human-readable justifications
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl Proposal {
    pub fn new(action: Action, confidence: f64) -> Self {
        Self {
            action,
            confidence,
            reasons: Vec::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}

/// Diagnostic bundle describing why a proposal was overridden.
///
/// `flags` and `reason_codes` are parallel lists in evaluation order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchInfo {
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub reason_codes: Vec<String>,
    /// Suggested delay before the next refresh when throttled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle_refresh_ms: Option<u64>,
}

impl MismatchInfo {
    /// Empty mismatch (nothing overridden).
    pub fn none() -> Self {
        Self::default()
    }

    /// Mismatch carrying a single flag / reason-code pair.
    pub fn single(flag: impl Into<String>, reason_code: impl Into<String>) -> Self {
        Self {
            flags: vec![flag.into()],
            reason_codes: vec![reason_code.into()],
            throttle_refresh_ms: None,
        }
    }

    pub fn with_throttle_refresh_ms(mut self, ms: u64) -> Self {
        self.throttle_refresh_ms = Some(ms);
        self
    }

    pub fn push(&mut self, flag: impl Into<String>, reason_code: impl Into<String>) {
        self.flags.push(flag.into());
        self.reason_codes.push(reason_code.into());
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.reason_codes.is_empty()
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    pub fn has_reason(&self, code: &str) -> bool {
        self.reason_codes.iter().any(|c| c == code)
    }
}

/// The executor-facing outcome of modulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub action: Action,
    pub allowed: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
    /// Present only when the proposal was overridden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<MismatchInfo>,
}

impl FinalDecision {
    /// Let the proposal through unchanged.
    pub fn pass_through(proposal: &Proposal) -> Self {
        Self {
            action: proposal.action.clone(),
            allowed: true,
            reasons: proposal.reasons.clone(),
            mismatch: None,
        }
    }

    /// Allow a (possibly adjusted) action.
    pub fn allow(action: Action, reasons: Vec<String>) -> Self {
        Self {
            action,
            allowed: true,
            reasons,
            mismatch: None,
        }
    }

    /// Replace the proposal with `action`. Reasons become the mismatch's reason codes.
    pub fn overridden(action: Action, mismatch: &MismatchInfo) -> Self {
        Self {
            action,
            allowed: false,
            reasons: mismatch.reason_codes.clone(),
            mismatch: Some(mismatch.clone()),
        }
    }

    pub fn is_overridden(&self) -> bool {
        !self.allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_through_keeps_action_and_reasons() {
        let proposal = Proposal::new(Action::Act, 0.8).with_reason("signal strong");
        let decision = FinalDecision::pass_through(&proposal);
        assert!(decision.allowed);
        assert_eq!(decision.action, Action::Act);
        assert_eq!(decision.reasons, vec!["signal strong".to_string()]);
        assert!(decision.mismatch.is_none());
    }

    #[test]
    fn overridden_substitutes_reason_codes() {
        let mismatch = MismatchInfo::single("staleness", "staleness_exceeded");
        let decision = FinalDecision::overridden(Action::Hold, &mismatch);
        assert!(decision.is_overridden());
        assert_eq!(decision.reasons, vec!["staleness_exceeded".to_string()]);
        assert_eq!(decision.mismatch.as_ref(), Some(&mismatch));
    }

    #[test]
    fn mismatch_queries() {
        let mut mismatch = MismatchInfo::none();
        assert!(mismatch.is_empty());

        mismatch.push("rate_limit", "rate_limit_exceeded");
        assert!(!mismatch.is_empty());
        assert!(mismatch.has_flag("rate_limit"));
        assert!(mismatch.has_reason("rate_limit_exceeded"));
        assert!(!mismatch.has_flag("staleness"));
    }

    #[test]
    fn throttle_hint_skipped_when_absent() {
        let json = serde_json::to_value(MismatchInfo::single("a", "b")).unwrap();
        assert!(json.get("throttle_refresh_ms").is_none());

        let json = serde_json::to_value(MismatchInfo::single("a", "b").with_throttle_refresh_ms(1500))
            .unwrap();
        assert_eq!(json["throttle_refresh_ms"], 1500);
    }
}
