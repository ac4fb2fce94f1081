//! Outbound response shapes.

use crate::handlers::error::HandlerError;
use pc_03_holder_chain::{IssuedChallenge, SeededChain};
use pc_05_token_refresh::RefreshedTokenWire;
use pc_06_snapshot_trace::TakenSnapshot;
use serde::Serialize;
use shared_types::{
    AttendanceSnapshot, Chain, ChainId, ChainTokenWire, ParticipantId, Timestamp, TokenId,
};

/// One line of output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Machine-readable code plus the error's display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ResponseEnvelope {
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<serde_json::Value>, error: &HandlerError) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(ErrorBody {
                code: error.code().to_string(),
                message: error.to_string(),
            }),
        }
    }

    /// Error code, for failures.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

/// A seeded chain with the token its first holder renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeededChainView {
    pub chain: Chain,
    pub token: ChainTokenWire,
}

impl From<&SeededChain> for SeededChainView {
    fn from(seeded: &SeededChain) -> Self {
        Self {
            chain: seeded.chain.clone(),
            token: seeded.token.to_wire(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    pub snapshot: AttendanceSnapshot,
    pub chains: Vec<SeededChainView>,
}

impl From<&TakenSnapshot> for SnapshotView {
    fn from(taken: &TakenSnapshot) -> Self {
        Self {
            snapshot: taken.snapshot.clone(),
            chains: taken.chains.iter().map(SeededChainView::from).collect(),
        }
    }
}

/// Liveness challenge as returned to the caller.
///
/// The plain code is only ever shown to the holder: when the requester asks
/// for a challenge the code is withheld and reaches the holder with their next
/// `refreshToken` poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeView {
    pub chain_id: ChainId,
    pub token_id: TokenId,
    pub requester_id: ParticipantId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub expires_at: Timestamp,
}

impl ChallengeView {
    /// The same challenge with its code removed.
    pub fn withheld(mut self) -> Self {
        self.code = None;
        self
    }
}

impl From<IssuedChallenge> for ChallengeView {
    fn from(issued: IssuedChallenge) -> Self {
        Self {
            chain_id: issued.chain_id,
            token_id: issued.token_id,
            requester_id: issued.requester_id,
            code: Some(issued.code),
            expires_at: issued.expires_at,
        }
    }
}

/// Holder poll result, with any challenge waiting for the holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshView {
    #[serde(flatten)]
    pub token: RefreshedTokenWire,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<ChallengeView>,
}
