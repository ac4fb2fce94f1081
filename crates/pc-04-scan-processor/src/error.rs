//! Error types for the Scan Processor
//!
//! Rejected scans are not errors; they come back as `ScanOutcome` values.
//! `ScanError` is reserved for callers without the right capability and for
//! infrastructure failures.

use pc_01_token_codec::CodecError;
use pc_02_record_store::StoreError;
use pc_03_holder_chain::ChainError;
use shared_types::{Capability, ChainKind, ParticipantId};
use thiserror::Error;

/// Scan Processor errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// Caller lacks the capability for this operation
    #[error("{subject} is not authorized for {capability:?}")]
    Unauthorized {
        subject: ParticipantId,
        capability: Capability,
    },

    /// Broadcast codes exist only for attendance directions
    #[error("No broadcast code for {0} chains")]
    UnsupportedKind(ChainKind),

    /// Record store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Holder State Machine failure that is not a scan outcome
    #[error("Holder chain error: {0}")]
    Chain(#[from] ChainError),

    /// Broadcast code could not be issued
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result type for scan processor operations
pub type ProcessResult<T> = Result<T, ScanError>;
