//! Ports for the Snapshot & Trace Engine

pub mod inbound;

pub use inbound::{SnapshotRequest, SnapshotTraceApi, TakenSnapshot};
