//! # Snapshot & Trace Engine Subsystem
//!
//! Spot-check attendance: a teacher takes a snapshot, fresh chains tagged with
//! its id start circulating, and afterwards the audit trail shows exactly who
//! handed the token to whom.
//!
//! | Operation | Writes | Reads |
//! |-----------|--------|-------|
//! | `take_snapshot` | new chains and tokens (via the Holder State Machine), the snapshot record | roster |
//! | `get_trace` | nothing | snapshot record, scan log |
//! | `compare` | nothing | both snapshot records, scan log |
//!
//! A snapshot's membership is its seed holders plus every participant who
//! received one of its chains in a successful hop. Existing chains of the
//! session are never touched.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{
    build_trace, compare_members, ChainTrace, SnapshotComparison, SnapshotTrace, TraceHop,
};
pub use error::{SnapshotError, SnapshotResult};
pub use ports::inbound::{SnapshotRequest, SnapshotTraceApi, TakenSnapshot};
pub use service::SnapshotTraceService;
