//! Domain layer for the Token Codec

mod payload;

pub use payload::{BroadcastClaim, BroadcastPayload, IssuedCode};
