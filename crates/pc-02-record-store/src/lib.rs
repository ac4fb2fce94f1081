//! # Chain Record Store Subsystem
//!
//! Typed access to every persisted record of the protocol, on top of any keyed
//! byte store that can apply a batch of conditional writes atomically.
//!
//! ## Optimistic Concurrency
//!
//! Every record carries a version. Readers get `Versioned<T>`; writers state
//! the version they read. A batch either applies completely or fails with
//! `StoreError::Conflict` and changes nothing.
//!
//! ```text
//! read chain (v7) ──► build batch ──► commit
//!                                       │
//!                   ┌───────────────────┴───────────────────┐
//!                   │ chain still v7                        │ chain now v8
//!                   ▼                                       ▼
//!          chain v8, token consumed,               Err(Conflict), nothing
//!          successor minted, scan logged           written; caller re-reads
//! ```
//!
//! ## Key Layout
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `c:` | session, chain id | `Chain` |
//! | `t:` | session, token id | `Token` |
//! | `l:` | session, recorded-at, log id | `ScanLogEntry` |
//! | `a:` | session, student id | `AttendanceRecord` |
//! | `s:` | session, snapshot id | `AttendanceSnapshot` |
//! | `ic:` | chain id | owning session |
//! | `is:` | snapshot id | owning session |
//!
//! Every session-scoped key starts with a length-prefixed session id, so a
//! prefix scan never bleeds into a neighbouring session.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;
pub mod test_utils;

pub use adapters::InMemoryKVStore;
pub use domain::{KeyPrefix, RecordWrite, Version, Versioned, WriteBatch};
pub use error::{StoreError, StoreResult};
pub use ports::inbound::RecordStoreApi;
pub use ports::outbound::{BatchOperation, KVStoreError, KeyValueStore, StoredValue};
pub use service::ChainRecordStore;
