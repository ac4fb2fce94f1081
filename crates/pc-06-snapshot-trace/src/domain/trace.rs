//! Hop-by-hop reconstruction of a snapshot's chains

use serde::Serialize;
use shared_types::{
    AttendanceSnapshot, ChainId, ParticipantId, ScanLogEntry, ScanResult, SessionId, SnapshotId,
    Timestamp,
};
use std::collections::BTreeSet;

/// One successful hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceHop {
    /// Sequence of the token that was consumed.
    pub sequence: u64,
    pub from_holder_id: Option<ParticipantId>,
    pub to_holder_id: ParticipantId,
    pub result: ScanResult,
    pub recorded_at: Timestamp,
}

/// Path of one snapshot chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTrace {
    pub chain_id: ChainId,
    pub snapshot_index: u32,
    pub seed_holder_id: ParticipantId,
    /// Hops in sequence order.
    pub hops: Vec<TraceHop>,
    /// Rejected scans against this chain.
    pub rejected_scans: usize,
}

impl ChainTrace {
    /// Seed holder followed by every receiver, in order.
    pub fn path(&self) -> Vec<ParticipantId> {
        std::iter::once(self.seed_holder_id.clone())
            .chain(self.hops.iter().map(|hop| hop.to_holder_id.clone()))
            .collect()
    }
}

/// Every chain of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTrace {
    pub snapshot_id: SnapshotId,
    pub session_id: SessionId,
    pub label: String,
    pub taken_at: Timestamp,
    /// In snapshot-index order.
    pub chains: Vec<ChainTrace>,
}

impl SnapshotTrace {
    /// Everyone who held any of the snapshot's chains.
    pub fn members(&self) -> BTreeSet<ParticipantId> {
        self.chains.iter().flat_map(ChainTrace::path).collect()
    }
}

/// Join the scan log onto a snapshot.
///
/// Entries of other snapshots and of ordinary chains are ignored.
pub fn build_trace(snapshot: &AttendanceSnapshot, log: &[ScanLogEntry]) -> SnapshotTrace {
    let chains = snapshot
        .chain_ids
        .iter()
        .zip(&snapshot.initial_holders)
        .enumerate()
        .map(|(index, (chain_id, seed_holder))| {
            let entries: Vec<&ScanLogEntry> = log
                .iter()
                .filter(|e| e.snapshot_id == Some(snapshot.id) && e.chain_id == Some(*chain_id))
                .collect();

            let mut hops: Vec<TraceHop> = entries
                .iter()
                .filter(|e| e.result.is_hop())
                .map(|e| TraceHop {
                    sequence: e.sequence.unwrap_or_default(),
                    from_holder_id: e.from_holder_id.clone(),
                    to_holder_id: e.scanner_id.clone(),
                    result: e.result,
                    recorded_at: e.recorded_at,
                })
                .collect();
            hops.sort_by_key(|hop| hop.sequence);

            ChainTrace {
                chain_id: *chain_id,
                snapshot_index: index as u32,
                seed_holder_id: seed_holder.clone(),
                rejected_scans: entries.len() - hops.len(),
                hops,
            }
        })
        .collect();

    SnapshotTrace {
        snapshot_id: snapshot.id,
        session_id: snapshot.session_id.clone(),
        label: snapshot.label.clone(),
        taken_at: snapshot.taken_at,
        chains,
    }
}
