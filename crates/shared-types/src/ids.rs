//! # Identifiers
//!
//! Sessions and participants are named by the external session/identity
//! collaborators, so they are opaque strings. Everything minted by the
//! protocol itself (chains, tokens, snapshots, scan logs) is a random UUID.

use crate::errors::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! external_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Build from a non-empty string.
            pub fn new(value: impl Into<String>) -> Result<Self, ParseError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(ParseError::EmptyId { kind: $kind });
                }
                Ok(Self(value))
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

macro_rules! minted_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| ParseError::InvalidId {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

external_id!(
    /// Session identifier issued by the session lifecycle service.
    SessionId,
    "session"
);

external_id!(
    /// Participant (student) identifier issued by the identity service.
    ParticipantId,
    "participant"
);

minted_id!(
    /// One token-passing lane.
    ChainId,
    "chain"
);

minted_id!(
    /// One hop's bearer secret.
    TokenId,
    "token"
);

minted_id!(
    /// A spot-check attendance capture.
    SnapshotId,
    "snapshot"
);

minted_id!(
    /// An immutable scan audit entry.
    ScanLogId,
    "scan log"
);
