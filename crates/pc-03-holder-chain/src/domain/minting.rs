//! Token minting

use shared_types::{Chain, ParticipantId, Timestamp, Token, TokenId, TokenStatus};

/// Mint a fresh live token for `holder` on `chain`.
///
/// The lifetime is clamped to at least one millisecond so `expires_at` is
/// always strictly after `issued_at`.
pub fn mint_token(
    chain: &Chain,
    holder: &ParticipantId,
    sequence: u64,
    now: Timestamp,
    ttl_ms: u64,
) -> Token {
    Token {
        id: TokenId::generate(),
        chain_id: chain.id,
        session_id: chain.session_id.clone(),
        holder_id: holder.clone(),
        sequence,
        issued_at: now,
        expires_at: now.saturating_add(ttl_ms.max(1)),
        status: TokenStatus::Live,
        challenge: None,
    }
}
