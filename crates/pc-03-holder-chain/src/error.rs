//! Error types for the Holder State Machine

use pc_02_record_store::StoreError;
use shared_types::{ChainId, ParticipantId, ScanResult, SessionId, Timestamp};
use thiserror::Error;

/// Holder State Machine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Requested chain count is out of range or exceeds eligible participants
    #[error("Invalid chain count {requested}: allowed 1..={max}, {eligible} eligible participants")]
    InvalidCount {
        requested: u32,
        max: u32,
        eligible: usize,
    },

    /// No such chain
    #[error("Chain not found: {0}")]
    ChainNotFound(ChainId),

    /// Presented token id is not a token of this chain
    #[error("Unknown token for chain {chain_id}")]
    UnknownToken { chain_id: ChainId },

    /// Token already consumed or superseded
    #[error("Stale token for chain {chain_id}")]
    StaleToken { chain_id: ChainId },

    /// Token lifetime elapsed
    #[error("Token expired at {expires_at}")]
    Expired { expires_at: Timestamp },

    /// Claimed holder does not hold the chain
    #[error("{claimed} is not the holder of chain {chain_id}")]
    NotHolder {
        chain_id: ChainId,
        claimed: ParticipantId,
    },

    /// Holder scanned their own code
    #[error("{participant} cannot transfer to themselves")]
    SelfTransfer { participant: ParticipantId },

    /// Liveness challenge unmet
    #[error("Liveness challenge failed on chain {chain_id}")]
    ChallengeFailed { chain_id: ChainId },

    /// Chain is terminal
    #[error("Chain {0} is closed")]
    ChainClosed(ChainId),

    /// Receiver already finalized for the chain's direction
    #[error("{participant} already marked in session {session_id}")]
    AlreadyMarked {
        session_id: SessionId,
        participant: ParticipantId,
    },

    /// Lost the optimistic-concurrency race twice
    #[error("Store conflict on {resource} after retry")]
    StoreConflict { resource: String },

    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ChainError {
    /// Audit result recorded when this error rejects a scan.
    ///
    /// `None` for infrastructure failures that are not scan outcomes.
    pub fn scan_result(&self) -> Option<ScanResult> {
        match self {
            ChainError::UnknownToken { .. } | ChainError::ChainNotFound(_) => {
                Some(ScanResult::RejectedInvalid)
            }
            ChainError::StaleToken { .. } => Some(ScanResult::RejectedStale),
            ChainError::Expired { .. } => Some(ScanResult::RejectedExpired),
            ChainError::NotHolder { .. } => Some(ScanResult::NotHolder),
            ChainError::SelfTransfer { .. } => Some(ScanResult::SelfTransfer),
            ChainError::ChallengeFailed { .. } => Some(ScanResult::ChallengeFailed),
            ChainError::ChainClosed(_) => Some(ScanResult::ChainClosed),
            ChainError::AlreadyMarked { .. } => Some(ScanResult::AlreadyMarked),
            // A conflict that survived the retry means another scan won the hop
            ChainError::StoreConflict { .. } => Some(ScanResult::RejectedStale),
            ChainError::InvalidCount { .. } | ChainError::Store(_) => None,
        }
    }

    /// Routine outcomes the client resolves by re-polling.
    pub fn is_routine(&self) -> bool {
        matches!(
            self,
            ChainError::StaleToken { .. }
                | ChainError::Expired { .. }
                | ChainError::AlreadyMarked { .. }
                | ChainError::StoreConflict { .. }
        )
    }
}

/// Result type for holder chain operations
pub type ChainResult<T> = Result<T, ChainError>;

/// Notify sink failure. Never propagated to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Notify failed: {reason}")]
pub struct NotifyError {
    pub reason: String,
}
