//! # Token Codec Subsystem
//!
//! Produces and verifies self-contained broadcast codes for the teacher's
//! ENTRY / EXIT / LATE / EARLY screens. A code is regenerated on every poll
//! and never touches the record store.
//!
//! ## Wire Format
//!
//! ```text
//! hex( nonce[24] || XChaCha20-Poly1305( bincode(BroadcastPayload) ) )
//!
//! BroadcastPayload { session_id, kind, issued_at, expires_at }
//! ```
//!
//! The sealing key is derived from the process-wide secret with a dedicated
//! BLAKE3 context, so the raw secret is never used as an AEAD key directly.
//!
//! ## Verification Outcomes
//!
//! | Input | Result |
//! |-------|--------|
//! | Intact, `now < expires_at` | `Ok(payload)` |
//! | Intact, `now >= expires_at` | `CodecError::Expired` |
//! | Bad hex, truncated, tampered, wrong key, garbled payload | `CodecError::Invalid` |
//!
//! ## Architecture
//!
//! - `domain/` - payload shapes
//! - `ports/inbound.rs` - `BroadcastCodecApi`
//! - `service.rs` - `TokenCodec`, generic over the clock

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{BroadcastClaim, BroadcastPayload, IssuedCode};
pub use error::{CodecError, CodecResult};
pub use ports::inbound::BroadcastCodecApi;
pub use service::{CodecConfig, TokenCodec, CODEC_KEY_CONTEXT};
