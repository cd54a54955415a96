use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by the object store and node label collaborators.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// The base version of a write is stale.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}
