//! Driving port (API - Inbound)

use crate::error::RefreshResult;
use async_trait::async_trait;
use serde::Serialize;
use shared_types::{ChainId, ChainTokenWire, ParticipantId, Token};

/// The holder's current token after a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub token: Token,
    /// Whether this call minted the token.
    pub refreshed: bool,
}

impl RefreshedToken {
    pub fn to_wire(&self) -> RefreshedTokenWire {
        RefreshedTokenWire {
            token: self.token.to_wire(),
            refreshed: self.refreshed,
        }
    }
}

/// JSON shape returned to the holder's client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokenWire {
    pub token: ChainTokenWire,
    pub refreshed: bool,
}

/// On-Demand Token Refresher API
#[async_trait]
pub trait TokenRefreshApi: Send + Sync {
    /// Return the holder's live token, replacing it first if it has expired.
    ///
    /// A replacement keeps the sequence number; expiry never counts as a hop.
    /// Concurrent calls for the same chain converge on one surviving token.
    async fn get_or_refresh_token(
        &self,
        chain_id: ChainId,
        holder_id: &ParticipantId,
    ) -> RefreshResult<RefreshedToken>;
}
