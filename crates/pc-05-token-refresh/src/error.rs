//! Error types for the Token Refresher

use pc_02_record_store::StoreError;
use shared_types::{ChainId, ParticipantId};
use thiserror::Error;

/// Token Refresher errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("Chain not found: {0}")]
    ChainNotFound(ChainId),

    /// Caller is not the chain's current holder
    #[error("{claimed} is not the holder of chain {chain_id}")]
    NotHolder {
        chain_id: ChainId,
        claimed: ParticipantId,
    },

    /// Closed chains have nothing to refresh
    #[error("Chain {0} is closed")]
    ChainClosed(ChainId),

    /// The chain points at a token that is missing or no longer live
    #[error("Chain {chain_id} has no live token")]
    NoLiveToken { chain_id: ChainId },

    /// Lost the optimistic-concurrency race twice
    #[error("Store conflict on chain {chain_id} after retry")]
    StoreConflict { chain_id: ChainId },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for refresh operations
pub type RefreshResult<T> = Result<T, RefreshError>;
