//! Domain layer for the Snapshot & Trace Engine
//!
//! Traces and comparisons are pure functions of a snapshot record and the
//! session's scan log.

pub mod compare;
pub mod trace;

pub use compare::{compare_members, SnapshotComparison};
pub use trace::{build_trace, ChainTrace, SnapshotTrace, TraceHop};
