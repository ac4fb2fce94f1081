//! # Adapters Layer
//!
//! Keyed store implementations. A networked document store adapter would
//! implement the same `KeyValueStore` port with its native conditional writes.

mod memory;

pub use memory::InMemoryKVStore;
