//! Driving port (API - Inbound)

use crate::domain::{SnapshotComparison, SnapshotTrace};
use crate::error::SnapshotResult;
use async_trait::async_trait;
use pc_03_holder_chain::SeededChain;
use shared_types::{AttendanceSnapshot, ChainKind, ClosingRule, SessionId, SnapshotId};

/// Request for a spot-check capture.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub session_id: SessionId,
    pub kind: ChainKind,
    pub chain_count: u32,
    /// Defaults to "Snapshot <n>".
    pub label: Option<String>,
    pub closing_rule: ClosingRule,
}

impl SnapshotRequest {
    pub fn new(session_id: SessionId, chain_count: u32) -> Self {
        Self {
            session_id,
            kind: ChainKind::Snapshot,
            chain_count,
            label: None,
            closing_rule: ClosingRule::Manual,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ChainKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_closing_rule(mut self, closing_rule: ClosingRule) -> Self {
        self.closing_rule = closing_rule;
        self
    }
}

/// A stored snapshot and the chains it seeded.
#[derive(Debug, Clone)]
pub struct TakenSnapshot {
    pub snapshot: AttendanceSnapshot,
    pub chains: Vec<SeededChain>,
}

/// Snapshot & Trace API
#[async_trait]
pub trait SnapshotTraceApi: Send + Sync {
    /// Seed `chain_count` fresh chains tagged with a new snapshot id.
    ///
    /// Chains already running in the session are not touched.
    async fn take_snapshot(&self, request: SnapshotRequest) -> SnapshotResult<TakenSnapshot>;

    /// Hop-by-hop path of every chain of a snapshot. Read-only.
    async fn get_trace(&self, snapshot_id: SnapshotId) -> SnapshotResult<SnapshotTrace>;

    /// Who appears in `b` but not `a`, in `a` but not `b`, and in both.
    ///
    /// Fails with `SnapshotNotFound` if either id is unknown.
    async fn compare(
        &self,
        snapshot_a: SnapshotId,
        snapshot_b: SnapshotId,
    ) -> SnapshotResult<SnapshotComparison>;

    async fn list_snapshots(&self, session_id: &SessionId) -> SnapshotResult<Vec<AttendanceSnapshot>>;
}
