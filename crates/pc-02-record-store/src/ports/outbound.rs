//! Driven port: the external keyed store.

use std::fmt;

/// Raw record bytes plus the version the store assigned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub version: u64,
    pub bytes: Vec<u8>,
}

/// Abstract interface for a keyed record store with conditional updates.
///
/// Implementations use interior mutability; every method takes `&self` so a
/// single store can be shared by all services behind an `Arc`.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<StoredValue>, KVStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied. Any
    /// failed precondition yields `KVStoreError::Conflict`.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    /// All entries whose key starts with `prefix`, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, StoredValue)>, KVStoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    /// Create a key that must not exist yet. Version starts at 1.
    Insert { key: Vec<u8>, value: Vec<u8> },
    /// Replace a key only if it is still at `expected_version`.
    Update {
        key: Vec<u8>,
        expected_version: u64,
        value: Vec<u8>,
    },
}

impl BatchOperation {
    /// Create an Insert operation.
    pub fn insert(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Insert {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create an Update operation.
    pub fn update(key: impl Into<Vec<u8>>, expected_version: u64, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Update {
            key: key.into(),
            expected_version,
            value: value.into(),
        }
    }

    /// Key this operation touches.
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOperation::Insert { key, .. } | BatchOperation::Update { key, .. } => key,
        }
    }
}

/// Keyed store errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KVStoreError {
    /// A precondition failed (key exists, or version moved on).
    Conflict { key: String },
    /// I/O error during read/write.
    IOError { message: String },
}

impl fmt::Display for KVStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KVStoreError::Conflict { key } => write!(f, "KV store conflict on {}", key),
            KVStoreError::IOError { message } => write!(f, "KV store I/O error: {}", message),
        }
    }
}

impl std::error::Error for KVStoreError {}

/// Printable form of a binary key for errors and logs.
pub fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key)
        .chars()
        .map(|c| if c.is_control() { '.' } else { c })
        .collect()
}
