//! What a scanner's device submits

use serde::{Deserialize, Serialize};
use shared_types::{ChainTokenWire, SessionId};
use std::fmt;

/// Which decoder a presented token goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenOrigin {
    /// Persisted chain token, looked up by id in the record store.
    Chain,
    /// Stateless teacher broadcast code, opened by the codec.
    Broadcast,
}

impl fmt::Display for TokenOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenOrigin::Chain => f.write_str("CHAIN"),
            TokenOrigin::Broadcast => f.write_str("BROADCAST"),
        }
    }
}

/// The token as read off the QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentedToken {
    Chain(ChainTokenWire),
    /// Hex-encoded sealed blob.
    Broadcast(String),
}

impl PresentedToken {
    pub fn origin(&self) -> TokenOrigin {
        match self {
            PresentedToken::Chain(_) => TokenOrigin::Chain,
            PresentedToken::Broadcast(_) => TokenOrigin::Broadcast,
        }
    }
}

/// Scan-time context supplied alongside the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanContext {
    /// Session the scanner is currently in. Tokens from any other session are
    /// rejected; required to audit undecodable broadcast codes.
    pub session_id: Option<SessionId>,
    /// Answer to a liveness challenge, if the holder's device showed one.
    pub challenge_code: Option<String>,
}

impl ScanContext {
    pub fn in_session(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
            challenge_code: None,
        }
    }

    #[must_use]
    pub fn with_challenge_code(mut self, code: impl Into<String>) -> Self {
        self.challenge_code = Some(code.into());
        self
    }
}
