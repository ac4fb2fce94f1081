//! Ports for the Chain Record Store

pub mod inbound;
pub mod outbound;

pub use inbound::RecordStoreApi;
pub use outbound::{BatchOperation, KVStoreError, KeyValueStore, StoredValue};
