//! Storage error types

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Storage backend error (quota, security restrictions, host failures)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A record with this key already exists
    #[error("constraint error: {0}")]
    Constraint(String),

    /// Record or key does not satisfy the store's key rules
    #[error("data error: {0}")]
    Data(String),

    /// Object store does not exist
    #[error("object store not found: {0}")]
    NotFound(String),

    /// Requested database version is lower than the stored one
    #[error("requested version {requested} is less than the existing version {current}")]
    Version { requested: u32, current: u32 },

    /// Configuration rejected before touching the backend
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation issued against a closed connection
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
