//! Error types for the Snapshot & Trace Engine

use pc_02_record_store::StoreError;
use pc_03_holder_chain::ChainError;
use shared_types::SnapshotId;
use thiserror::Error;

/// Snapshot & Trace errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    /// Seeding the snapshot's chains failed (e.g. `InvalidCount`)
    #[error("Seeding failed: {0}")]
    Chain(#[from] ChainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;
