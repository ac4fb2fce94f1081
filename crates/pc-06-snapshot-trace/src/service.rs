//! Snapshot & Trace Service

use crate::domain::{build_trace, compare_members, SnapshotComparison, SnapshotTrace};
use crate::error::{SnapshotError, SnapshotResult};
use crate::ports::inbound::{SnapshotRequest, SnapshotTraceApi, TakenSnapshot};
use async_trait::async_trait;
use pc_02_record_store::{RecordStoreApi, WriteBatch};
use pc_03_holder_chain::{HolderChainApi, NotifySink, SeedRequest};
use shared_bus::PresenceEvent;
use shared_types::{
    AttendanceSnapshot, CloseReason, ParticipantId, SessionId, SnapshotId, TimeSource,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Snapshot & Trace Engine implementation
pub struct SnapshotTraceService<R, H, N, T>
where
    R: RecordStoreApi,
    H: HolderChainApi,
    N: NotifySink,
    T: TimeSource,
{
    store: Arc<R>,
    holder: Arc<H>,
    notifier: Arc<N>,
    time_source: Arc<T>,
}

impl<R, H, N, T> SnapshotTraceService<R, H, N, T>
where
    R: RecordStoreApi,
    H: HolderChainApi,
    N: NotifySink,
    T: TimeSource,
{
    pub fn new(store: Arc<R>, holder: Arc<H>, notifier: Arc<N>, time_source: Arc<T>) -> Self {
        Self {
            store,
            holder,
            notifier,
            time_source,
        }
    }

    fn load(&self, snapshot_id: SnapshotId) -> SnapshotResult<AttendanceSnapshot> {
        self.store
            .get_snapshot(&snapshot_id)?
            .ok_or(SnapshotError::SnapshotNotFound(snapshot_id))
    }

    fn trace_of(&self, snapshot: &AttendanceSnapshot) -> SnapshotResult<SnapshotTrace> {
        let log = self.store.scan_log(&snapshot.session_id)?;
        Ok(build_trace(snapshot, &log))
    }
}

#[async_trait]
impl<R, H, N, T> SnapshotTraceApi for SnapshotTraceService<R, H, N, T>
where
    R: RecordStoreApi + 'static,
    H: HolderChainApi + 'static,
    N: NotifySink + 'static,
    T: TimeSource + 'static,
{
    async fn take_snapshot(&self, request: SnapshotRequest) -> SnapshotResult<TakenSnapshot> {
        let snapshot_id = SnapshotId::generate();
        let chains = self
            .holder
            .seed(
                SeedRequest::new(request.session_id.clone(), request.kind, request.chain_count)
                    .with_closing_rule(request.closing_rule.clone())
                    .for_snapshot(snapshot_id),
            )
            .await?;

        let label = match request.label {
            Some(label) => label,
            None => {
                let taken = self.store.list_snapshots(&request.session_id)?.len();
                format!("Snapshot {}", taken + 1)
            }
        };
        let initial_holders: Vec<ParticipantId> =
            chains.iter().map(|c| c.chain.current_holder_id.clone()).collect();
        let students_captured = initial_holders.iter().collect::<BTreeSet<_>>().len() as u32;

        let snapshot = AttendanceSnapshot {
            id: snapshot_id,
            session_id: request.session_id.clone(),
            label,
            kind: request.kind,
            taken_at: self.time_source.now(),
            chain_ids: chains.iter().map(|c| c.chain.id).collect(),
            chains_created: chains.len() as u32,
            students_captured,
            initial_holders,
        };

        if let Err(e) = self
            .store
            .commit(WriteBatch::new().create_snapshot(snapshot.clone()))
        {
            // Untracked snapshot chains would never show up in a trace
            warn!(snapshot_id = %snapshot_id, error = %e, "Snapshot record failed, closing its chains");
            for seeded in &chains {
                if let Err(close_err) = self
                    .holder
                    .close(seeded.chain.id, CloseReason::ForceEnded)
                    .await
                {
                    warn!(chain_id = %seeded.chain.id, error = %close_err, "Could not close orphaned chain");
                }
            }
            return Err(e.into());
        }

        info!(
            snapshot_id = %snapshot_id,
            session_id = %snapshot.session_id,
            label = %snapshot.label,
            chains = snapshot.chains_created,
            "Snapshot taken"
        );

        if let Err(e) = self
            .notifier
            .notify(PresenceEvent::SnapshotTaken {
                session_id: snapshot.session_id.clone(),
                snapshot_id,
                chains_created: snapshot.chains_created,
            })
            .await
        {
            warn!(error = %e, "Notify sink failed, observers fall back to polling");
        }

        Ok(TakenSnapshot { snapshot, chains })
    }

    async fn get_trace(&self, snapshot_id: SnapshotId) -> SnapshotResult<SnapshotTrace> {
        let snapshot = self.load(snapshot_id)?;
        self.trace_of(&snapshot)
    }

    async fn compare(
        &self,
        snapshot_a: SnapshotId,
        snapshot_b: SnapshotId,
    ) -> SnapshotResult<SnapshotComparison> {
        let a = self.load(snapshot_a)?;
        let b = self.load(snapshot_b)?;
        let members_a = self.trace_of(&a)?.members();
        let members_b = self.trace_of(&b)?.members();

        Ok(compare_members(snapshot_a, &members_a, snapshot_b, &members_b))
    }

    async fn list_snapshots(&self, session_id: &SessionId) -> SnapshotResult<Vec<AttendanceSnapshot>> {
        Ok(self.store.list_snapshots(session_id)?)
    }
}
