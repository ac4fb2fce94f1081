//! Snapshot comparison

use serde::Serialize;
use shared_types::{ParticipantId, SnapshotId};
use std::collections::BTreeSet;

/// Membership difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotComparison {
    pub snapshot_a: SnapshotId,
    pub snapshot_b: SnapshotId,
    /// In B but not in A.
    pub added: Vec<ParticipantId>,
    /// In A but not in B.
    pub removed: Vec<ParticipantId>,
    /// In both.
    pub unchanged: Vec<ParticipantId>,
}

/// Set difference of two membership sets, each side sorted.
pub fn compare_members(
    snapshot_a: SnapshotId,
    members_a: &BTreeSet<ParticipantId>,
    snapshot_b: SnapshotId,
    members_b: &BTreeSet<ParticipantId>,
) -> SnapshotComparison {
    SnapshotComparison {
        snapshot_a,
        snapshot_b,
        added: members_b.difference(members_a).cloned().collect(),
        removed: members_a.difference(members_b).cloned().collect(),
        unchanged: members_a.intersection(members_b).cloned().collect(),
    }
}
