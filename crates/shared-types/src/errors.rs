//! # Error Types
//!
//! Errors raised while constructing shared values from untrusted input.

use thiserror::Error;

/// Errors produced when parsing identifiers or enum names from the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Identifier was not a valid UUID.
    #[error("Invalid {kind} identifier: {value}")]
    InvalidId { kind: &'static str, value: String },

    /// Identifier was empty.
    #[error("Empty {kind} identifier")]
    EmptyId { kind: &'static str },

    /// Unknown chain kind name.
    #[error("Unknown chain kind: {0}")]
    UnknownChainKind(String),
}
