//! Handler errors and their wire codes.

use pc_03_holder_chain::ChainError;
use pc_04_scan_processor::ScanError;
use pc_05_token_refresh::RefreshError;
use pc_06_snapshot_trace::SnapshotError;
use shared_types::{Capability, ParticipantId};
use thiserror::Error;

/// Everything a request can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Input line is not a valid request
    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("{subject} is not authorized for {capability:?}")]
    Unauthorized {
        subject: ParticipantId,
        capability: Capability,
    },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Result could not be encoded
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for handlers
pub type HandlerResult<T> = Result<T, HandlerError>;

impl HandlerError {
    /// Stable code clients branch on.
    pub fn code(&self) -> &'static str {
        match self {
            HandlerError::BadRequest(_) => "BAD_REQUEST",
            HandlerError::Unauthorized { .. } => "UNAUTHORIZED",
            HandlerError::Chain(e) => chain_code(e),
            HandlerError::Scan(e) => match e {
                ScanError::Unauthorized { .. } => "UNAUTHORIZED",
                ScanError::UnsupportedKind(_) => "UNSUPPORTED_KIND",
                ScanError::Chain(e) => chain_code(e),
                ScanError::Codec(_) => "CODEC_ERROR",
                ScanError::Store(_) => "STORE_ERROR",
            },
            HandlerError::Refresh(e) => match e {
                RefreshError::ChainNotFound(_) => "CHAIN_NOT_FOUND",
                RefreshError::NotHolder { .. } => "NOT_HOLDER",
                RefreshError::ChainClosed(_) => "CHAIN_CLOSED",
                RefreshError::NoLiveToken { .. } => "NO_LIVE_TOKEN",
                RefreshError::StoreConflict { .. } => "STORE_CONFLICT",
                RefreshError::Store(_) => "STORE_ERROR",
            },
            HandlerError::Snapshot(e) => match e {
                SnapshotError::SnapshotNotFound(_) => "SNAPSHOT_NOT_FOUND",
                SnapshotError::Chain(e) => chain_code(e),
                SnapshotError::Store(_) => "STORE_ERROR",
            },
            HandlerError::Encode(_) | HandlerError::Internal(_) => "INTERNAL",
        }
    }

    /// Failures of the process rather than of the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self.code(),
            "STORE_ERROR" | "STORE_CONFLICT" | "CODEC_ERROR" | "INTERNAL"
        )
    }
}

fn chain_code(err: &ChainError) -> &'static str {
    match err {
        ChainError::InvalidCount { .. } => "INVALID_COUNT",
        ChainError::ChainNotFound(_) => "CHAIN_NOT_FOUND",
        ChainError::UnknownToken { .. } => "UNKNOWN_TOKEN",
        ChainError::StaleToken { .. } => "STALE_TOKEN",
        ChainError::Expired { .. } => "EXPIRED",
        ChainError::NotHolder { .. } => "NOT_HOLDER",
        ChainError::SelfTransfer { .. } => "SELF_TRANSFER",
        ChainError::ChallengeFailed { .. } => "CHALLENGE_FAILED",
        ChainError::ChainClosed(_) => "CHAIN_CLOSED",
        ChainError::AlreadyMarked { .. } => "ALREADY_MARKED",
        ChainError::StoreConflict { .. } => "STORE_CONFLICT",
        ChainError::Store(_) => "STORE_ERROR",
    }
}
