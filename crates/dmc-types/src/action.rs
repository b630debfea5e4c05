use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Executable intent.
///
/// `Act` and `Quote` are the pass-through variants an engine proposes.
/// `Hold`, `Flatten`, `CancelAll` and `Stop` are protective; only `Hold` and
/// `Stop` are valid fail-closed outcomes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Generic "go ahead"
    Act,
    /// Two-sided quote, optionally carrying prices and size
    Quote(QuoteParams),
    /// Neutral, do nothing this step
    Hold,
    /// Close the open position
    Flatten,
    /// Cancel every resting order
    CancelAll,
    /// Hard stop
    Stop,
}

/// Optional fields carried by [`Action::Quote`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteParams {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub size_usd: Option<f64>,
    pub post_only: bool,
}

impl QuoteParams {
    pub fn new(bid: f64, ask: f64) -> Self {
        Self {
            bid: Some(bid),
            ask: Some(ask),
            ..Self::default()
        }
    }

    pub fn with_size_usd(mut self, size_usd: f64) -> Self {
        self.size_usd = Some(size_usd);
        self
    }

    pub fn post_only(mut self) -> Self {
        self.post_only = true;
        self
    }
}

impl Action {
    /// Bare quote with no prices or size.
    pub fn quote() -> Self {
        Action::Quote(QuoteParams::default())
    }

    /// Stable upper-case name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Act => "ACT",
            Action::Quote(_) => "QUOTE",
            Action::Hold => "HOLD",
            Action::Flatten => "FLATTEN",
            Action::CancelAll => "CANCEL_ALL",
            Action::Stop => "STOP",
        }
    }

    /// Whether this action is an allowed fail-closed outcome (`Hold` or `Stop`).
    pub fn is_fail_closed(&self) -> bool {
        matches!(self, Action::Hold | Action::Stop)
    }

    /// Restrict to {Hold, Stop}; anything else becomes `Hold`.
    pub fn fail_closed(&self) -> Action {
        match self {
            Action::Stop => Action::Stop,
            _ => Action::Hold,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACT" => Ok(Action::Act),
            "QUOTE" => Ok(Action::quote()),
            "HOLD" => Ok(Action::Hold),
            "FLATTEN" => Ok(Action::Flatten),
            "CANCEL_ALL" => Ok(Action::CancelAll),
            "STOP" => Ok(Action::Stop),
            _ => Err(TypesError::UnknownAction(s.to_string())),
        }
    }
}
