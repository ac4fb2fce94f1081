//! Error types for the Token Codec

use shared_crypto::CryptoError;
use shared_types::{ChainKind, SessionId, Timestamp};
use thiserror::Error;

/// Token Codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Integrity intact but the embedded deadline has passed.
    /// The sealed claim is still trustworthy, so it travels with the error.
    #[error("Broadcast {kind} code for session {session_id} expired at {expires_at} (now {now})")]
    Expired {
        session_id: SessionId,
        kind: ChainKind,
        expires_at: Timestamp,
        now: Timestamp,
    },

    /// Tampered, truncated, foreign-key or otherwise unreadable code
    #[error("Invalid broadcast code: {reason}")]
    Invalid { reason: String },

    /// A code must live for at least one second
    #[error("TTL must be positive")]
    ZeroTtl,

    /// Sealing failed
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CodecError {
    /// Session of a code that passed the integrity check but was refused.
    pub fn verified_session(&self) -> Option<&SessionId> {
        match self {
            Self::Expired { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
