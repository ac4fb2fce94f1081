//! # Shared Crypto - Token Sealing Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305 | Sealing stateless broadcast codes |
//! | `hashing` | BLAKE3 (keyed / derive-key) | Liveness challenge code hashes, subkey derivation |
//!
//! ## Security Properties
//!
//! - **XChaCha20**: 192-bit random nonce per seal, so nonce reuse is not a concern
//!   at classroom scale
//! - **Poly1305**: any bit flip in nonce or ciphertext fails `open`
//! - **BLAKE3 keyed**: challenge hashes are useless without the process secret

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{blake3_derive_key, blake3_keyed_hash, keyed_hash_matches};
pub use symmetric::{decrypt, encrypt, open, seal, Nonce, SecretKey, NONCE_LEN};

