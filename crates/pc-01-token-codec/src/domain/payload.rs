//! Broadcast payloads

use serde::{Deserialize, Serialize};
use shared_types::{ChainKind, SessionId, Timestamp};

/// What a broadcast code asserts, before timestamps are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastClaim {
    pub session_id: SessionId,
    pub kind: ChainKind,
}

impl BroadcastClaim {
    pub fn new(session_id: SessionId, kind: ChainKind) -> Self {
        Self { session_id, kind }
    }
}

/// Plaintext sealed inside a broadcast code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastPayload {
    pub session_id: SessionId,
    pub kind: ChainKind,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

impl BroadcastPayload {
    /// Whether the embedded deadline has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// An issued code together with its decoded deadline, for the teacher's client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCode {
    pub code: String,
    pub kind: ChainKind,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}
