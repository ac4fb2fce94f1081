//! Error types for the Chain Record Store

use crate::ports::outbound::KVStoreError;
use thiserror::Error;

/// Record store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Lost an optimistic-concurrency race; nothing was written
    #[error("Store conflict on {key}")]
    Conflict { key: String },

    /// Backend failure
    #[error("Store backend error: {message}")]
    Backend { message: String },

    /// Record bytes could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// An index points at a record that does not exist
    #[error("Dangling index entry: {key}")]
    DanglingIndex { key: String },
}

impl StoreError {
    /// Whether re-reading and retrying may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<KVStoreError> for StoreError {
    fn from(err: KVStoreError) -> Self {
        match err {
            KVStoreError::Conflict { key } => StoreError::Conflict { key },
            KVStoreError::IOError { message } => StoreError::Backend { message },
        }
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;
