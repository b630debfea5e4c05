//! # dmc-types
//!
//! Decision schema shared between a decision engine, the modulation core and
//! the downstream executor.
//!
//! ## Types
//!
//! - [`Action`]: closed set of executable intents (`Act`, `Quote`, `Hold`,
//!   `Flatten`, `CancelAll`, `Stop`)
//! - [`Proposal`]: what the engine wants to do, with confidence and reasons
//! - [`FinalDecision`]: what the executor is allowed to do
//! - [`MismatchInfo`]: why a proposal was overridden
//! - [`DecisionPacket`]: per-step record for replay and audit
//!
//! All types are plain data: immutable once built, compared by value and
//! serializable with `serde`.

pub mod action;
pub mod decision;
pub mod error;
pub mod packet;

pub use action::{Action, QuoteParams};
pub use decision::{FinalDecision, MismatchInfo, Proposal};
pub use error::{Result, TypesError};
pub use packet::DecisionPacket;
