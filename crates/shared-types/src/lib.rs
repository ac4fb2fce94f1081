//! # Shared Types Crate
//!
//! Single source of truth for the record shapes that flow between the
//! Presence-Chain components.
//!
//! ## Contents
//!
//! | Module | Provides |
//! |--------|----------|
//! | `ids` | Session, participant, chain, token, snapshot and scan-log identifiers |
//! | `entities` | `Chain`, `Token`, `ScanLogEntry`, `AttendanceRecord`, `AttendanceSnapshot` |
//! | `time` | `Timestamp`, the `TimeSource` port and clock implementations |
//! | `ttl` | Per-kind lifetimes for chain tokens and broadcast codes |
//! | `security` | Identity claims, capabilities and the `Authorizer` predicate |
//!
//! ## Ownership
//!
//! - `Chain` and `Token` belong to the chain's session.
//! - `AttendanceRecord` belongs to the (session, student) pair.
//! - `ScanLogEntry` and `AttendanceSnapshot` are append-only.

pub mod entities;
pub mod errors;
pub mod ids;
pub mod security;
pub mod time;
pub mod ttl;

pub use entities::*;
pub use errors::*;
pub use ids::*;
pub use security::*;
pub use time::*;
pub use ttl::*;
