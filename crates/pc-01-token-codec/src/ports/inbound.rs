//! Driving port (API - Inbound)

use crate::domain::{BroadcastClaim, BroadcastPayload, IssuedCode};
use crate::error::CodecResult;
use shared_types::{ChainKind, SessionId};

/// Stateless broadcast code API.
///
/// Every method is pure computation plus a clock read; none of them perform I/O.
pub trait BroadcastCodecApi: Send + Sync {
    /// Seal `claim` into an opaque code valid for `ttl_secs` from now.
    fn issue(&self, claim: BroadcastClaim, ttl_secs: u64) -> CodecResult<String>;

    /// Open and check a code.
    ///
    /// Returns `CodecError::Expired` or `CodecError::Invalid` for rejected codes.
    fn verify(&self, code: &str) -> CodecResult<BroadcastPayload>;

    /// Issue a code for `kind` using the configured per-kind lifetime.
    fn issue_for_kind(&self, session_id: SessionId, kind: ChainKind) -> CodecResult<IssuedCode>;
}
