use std::path::PathBuf;

use thiserror::Error;

/// Unexpected evaluation errors.
///
/// These never reach the caller of [`crate::modulate`]; the modulator turns
/// them into a disallowed decision flagged `modulate_exception` with
/// [`ModulateError::kind`] as the reason code.
#[derive(Error, Debug)]
pub enum ModulateError {
    #[error("invalid context: {0}")]
    InvalidContext(#[from] ContextError),

    #[error("invalid policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    #[error("evaluation panicked: {0}")]
    Panicked(String),
}

impl ModulateError {
    /// Stable reason code for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            ModulateError::InvalidContext(_) => "invalid_context",
            ModulateError::InvalidPolicy(_) => "invalid_policy",
            ModulateError::Panicked(_) => "panic",
        }
    }
}

/// The context map could not be projected into a typed context.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("malformed context value: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
}

/// A policy threshold is outside its domain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: String },

    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
}

/// Failure inside a policy override hook. Always absorbed by the modulator.
#[derive(Error, Debug)]
pub enum OverrideError {
    #[error("override rejected: {0}")]
    Rejected(String),

    #[error("override source unavailable: {0}")]
    Unavailable(String),
}

/// Errors loading or saving policy configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy in config: {0}")]
    Invalid(#[from] PolicyError),
}

pub type Result<T> = std::result::Result<T, ModulateError>;
