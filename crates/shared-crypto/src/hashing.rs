//! # BLAKE3 Hashing
//!
//! Keyed hashing for values that must be verifiable but never stored in the
//! clear, and context-separated subkey derivation from the process secret.

/// BLAKE3 hash output (256-bit).
pub type Hash = [u8; 32];

/// Keyed hash (MAC).
pub fn blake3_keyed_hash(key: &[u8; 32], data: &[u8]) -> Hash {
    *blake3::keyed_hash(key, data).as_bytes()
}

/// Constant-time check of `data` against a stored keyed hash.
pub fn keyed_hash_matches(key: &[u8; 32], data: &[u8], expected: &Hash) -> bool {
    blake3::keyed_hash(key, data) == blake3::Hash::from(*expected)
}

/// Derive key from context and input key material.
pub fn blake3_derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    blake3::derive_key(context, key_material)
}
