//! Holder transitions
//!
//! ```text
//! [SEEDED] ──hop──→ [ACTIVE] ──hop──→ [ACTIVE] ...
//!     │                 │
//!     │                 └──closing hop / close──→ [CLOSED]
//!     └────────────closing hop / close──────────→ [CLOSED]
//! ```

use crate::domain::minting::mint_token;
use crate::error::{ChainError, ChainResult};
use shared_types::{
    Chain, ChainPhase, ClosingRule, CloseReason, ParticipantId, ScanResult, Timestamp, Token,
    TokenId, TokenStatus,
};

/// One attempt to move a chain's token.
#[derive(Debug, Clone)]
pub struct TransferAttempt<'a> {
    /// Holder named on the presented token.
    pub from: &'a ParticipantId,
    /// Scanner receiving the token.
    pub to: &'a ParticipantId,
    /// Token id on the presented code.
    pub presented: TokenId,
    pub now: Timestamp,
}

/// Validate a transfer against the chain's current state.
///
/// Check order: closed, unknown, stale, holder, self-transfer, expiry. A
/// consumed token is always stale, even after it also expired, so replay is
/// reported as replay.
pub fn check_transfer(
    chain: &Chain,
    token: Option<&Token>,
    attempt: &TransferAttempt<'_>,
) -> ChainResult<()> {
    if chain.is_closed() {
        return Err(ChainError::ChainClosed(chain.id));
    }

    let Some(token) = token.filter(|t| t.chain_id == chain.id && t.id == attempt.presented) else {
        return Err(ChainError::UnknownToken { chain_id: chain.id });
    };

    if chain.current_token_id != Some(token.id) || token.status != TokenStatus::Live {
        return Err(ChainError::StaleToken { chain_id: chain.id });
    }

    if attempt.from != &chain.current_holder_id || token.holder_id != chain.current_holder_id {
        return Err(ChainError::NotHolder {
            chain_id: chain.id,
            claimed: attempt.from.clone(),
        });
    }

    if attempt.to == attempt.from {
        return Err(ChainError::SelfTransfer {
            participant: attempt.to.clone(),
        });
    }

    if token.is_expired(attempt.now) {
        return Err(ChainError::Expired {
            expires_at: token.expires_at,
        });
    }

    Ok(())
}

/// Everything a validated hop writes.
#[derive(Debug, Clone)]
pub struct HopPlan {
    /// Chain after the hop.
    pub chain: Chain,
    /// Presented token, now consumed.
    pub consumed: Token,
    /// Token for the new holder; `None` on a closing hop.
    pub successor: Option<Token>,
    pub result: ScanResult,
}

fn close_reason(rule: &ClosingRule, to: &ParticipantId, rotation: u64) -> Option<CloseReason> {
    if !rule.is_met(to, rotation) {
        return None;
    }
    match rule {
        ClosingRule::ClosingParticipant(_) => Some(CloseReason::ClosingParticipantReached),
        ClosingRule::MaxHops(_) => Some(CloseReason::HopLimitReached),
        ClosingRule::Manual => None,
    }
}

/// Compute the result of handing `token` to `to`.
///
/// The caller must have run [`check_transfer`] first.
pub fn plan_hop(
    chain: &Chain,
    token: &Token,
    to: &ParticipantId,
    now: Timestamp,
    ttl_ms: u64,
) -> HopPlan {
    let rotation = chain.rotation_count + 1;

    let mut consumed = token.clone();
    consumed.status = TokenStatus::Consumed;

    let mut next = chain.clone();
    next.current_holder_id = to.clone();
    next.previous_token_id = Some(token.id);
    next.rotation_count = rotation;

    match close_reason(&chain.closing_rule, to, rotation) {
        Some(reason) => {
            next.phase = ChainPhase::Closed;
            next.current_token_id = None;
            next.closed_at = Some(now);
            next.close_reason = Some(reason);
            HopPlan {
                chain: next,
                consumed,
                successor: None,
                result: ScanResult::ChainCompleted,
            }
        }
        None => {
            let successor = mint_token(chain, to, token.sequence + 1, now, ttl_ms);
            next.phase = ChainPhase::Active;
            next.current_token_id = Some(successor.id);
            HopPlan {
                chain: next,
                consumed,
                successor: Some(successor),
                result: ScanResult::Transferred,
            }
        }
    }
}
