use thiserror::Error;

/// Errors from the decision schema.
#[derive(Error, Debug)]
pub enum TypesError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TypesError>;
