//! Chain Record Store Service
//!
//! Maps typed records onto the keyed store and back.

use crate::domain::{KeyPrefix, RecordWrite, Versioned, WriteBatch};
use crate::error::{StoreError, StoreResult};
use crate::ports::inbound::RecordStoreApi;
use crate::ports::outbound::{display_key, BatchOperation, KeyValueStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{
    AttendanceRecord, AttendanceSnapshot, Chain, ChainId, ParticipantId, ScanLogEntry, SessionId,
    SnapshotId, Token, TokenId,
};
use std::sync::Arc;
use tracing::debug;

/// Typed repository over a `KeyValueStore`.
pub struct ChainRecordStore<S: KeyValueStore> {
    kv: Arc<S>,
}

impl<S: KeyValueStore> ChainRecordStore<S> {
    pub fn new(kv: Arc<S>) -> Self {
        Self { kv }
    }

    /// Underlying keyed store.
    pub fn kv(&self) -> &Arc<S> {
        &self.kv
    }

    fn read<T: DeserializeOwned>(&self, key: &[u8]) -> StoreResult<Option<Versioned<T>>> {
        match self.kv.get(key)? {
            Some(stored) => {
                let value = bincode::deserialize(&stored.bytes)?;
                Ok(Some(Versioned::new(stored.version, value)))
            }
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &[u8]) -> StoreResult<Vec<Versioned<T>>> {
        self.kv
            .prefix_scan(prefix)?
            .into_iter()
            .map(|(_, stored)| {
                let value = bincode::deserialize(&stored.bytes)?;
                Ok(Versioned::new(stored.version, value))
            })
            .collect()
    }

    /// Resolve an index entry to the session that owns the record.
    fn owner(&self, index_key: &[u8]) -> StoreResult<Option<SessionId>> {
        Ok(self
            .read::<SessionId>(index_key)?
            .map(Versioned::into_inner))
    }

    fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn to_operations(write: RecordWrite) -> StoreResult<Vec<BatchOperation>> {
        let ops = match write {
            RecordWrite::CreateChain(chain) => vec![
                BatchOperation::insert(
                    KeyPrefix::chain_key(&chain.session_id, &chain.id),
                    Self::encode(&chain)?,
                ),
                BatchOperation::insert(
                    KeyPrefix::chain_index_key(&chain.id),
                    Self::encode(&chain.session_id)?,
                ),
            ],
            RecordWrite::UpdateChain { chain, expected } => vec![BatchOperation::update(
                KeyPrefix::chain_key(&chain.session_id, &chain.id),
                expected,
                Self::encode(&chain)?,
            )],
            RecordWrite::CreateToken(token) => vec![BatchOperation::insert(
                KeyPrefix::token_key(&token.session_id, &token.id),
                Self::encode(&token)?,
            )],
            RecordWrite::UpdateToken { token, expected } => vec![BatchOperation::update(
                KeyPrefix::token_key(&token.session_id, &token.id),
                expected,
                Self::encode(&token)?,
            )],
            RecordWrite::AppendScanLog(entry) => vec![BatchOperation::insert(
                KeyPrefix::scan_log_key(&entry.session_id, entry.recorded_at, &entry.id),
                Self::encode(&entry)?,
            )],
            RecordWrite::CreateAttendance(record) => vec![BatchOperation::insert(
                KeyPrefix::attendance_key(&record.session_id, &record.student_id),
                Self::encode(&record)?,
            )],
            RecordWrite::UpdateAttendance { record, expected } => vec![BatchOperation::update(
                KeyPrefix::attendance_key(&record.session_id, &record.student_id),
                expected,
                Self::encode(&record)?,
            )],
            RecordWrite::CreateSnapshot(snapshot) => vec![
                BatchOperation::insert(
                    KeyPrefix::snapshot_key(&snapshot.session_id, &snapshot.id),
                    Self::encode(&snapshot)?,
                ),
                BatchOperation::insert(
                    KeyPrefix::snapshot_index_key(&snapshot.id),
                    Self::encode(&snapshot.session_id)?,
                ),
            ],
        };
        Ok(ops)
    }
}

impl<S: KeyValueStore> RecordStoreApi for ChainRecordStore<S> {
    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let writes = batch.len();
        let mut operations = Vec::with_capacity(writes * 2);
        for write in batch.into_writes() {
            operations.extend(Self::to_operations(write)?);
        }

        match self.kv.atomic_batch_write(operations) {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = StoreError::from(e);
                debug!(writes, error = %err, "Batch rejected");
                Err(err)
            }
        }
    }

    fn get_chain(&self, chain_id: &ChainId) -> StoreResult<Option<Versioned<Chain>>> {
        let index_key = KeyPrefix::chain_index_key(chain_id);
        let Some(session_id) = self.owner(&index_key)? else {
            return Ok(None);
        };
        match self.read(&KeyPrefix::chain_key(&session_id, chain_id))? {
            Some(chain) => Ok(Some(chain)),
            None => Err(StoreError::DanglingIndex {
                key: display_key(&index_key),
            }),
        }
    }

    fn list_chains(&self, session_id: &SessionId) -> StoreResult<Vec<Versioned<Chain>>> {
        let mut chains: Vec<Versioned<Chain>> =
            self.scan(&KeyPrefix::Chain.partition(session_id))?;
        chains.sort_by_key(|c| {
            (
                c.value.created_at,
                c.value.snapshot.map(|tag| tag.snapshot_index),
                c.value.id,
            )
        });
        Ok(chains)
    }

    fn get_token(
        &self,
        session_id: &SessionId,
        token_id: &TokenId,
    ) -> StoreResult<Option<Versioned<Token>>> {
        self.read(&KeyPrefix::token_key(session_id, token_id))
    }

    fn get_attendance(
        &self,
        session_id: &SessionId,
        student_id: &ParticipantId,
    ) -> StoreResult<Option<Versioned<AttendanceRecord>>> {
        self.read(&KeyPrefix::attendance_key(session_id, student_id))
    }

    fn list_attendance(&self, session_id: &SessionId) -> StoreResult<Vec<Versioned<AttendanceRecord>>> {
        let mut records: Vec<Versioned<AttendanceRecord>> =
            self.scan(&KeyPrefix::Attendance.partition(session_id))?;
        records.sort_by(|a, b| {
            (a.value.joined_at, &a.value.student_id).cmp(&(b.value.joined_at, &b.value.student_id))
        });
        Ok(records)
    }

    fn scan_log(&self, session_id: &SessionId) -> StoreResult<Vec<ScanLogEntry>> {
        Ok(self
            .scan::<ScanLogEntry>(&KeyPrefix::ScanLog.partition(session_id))?
            .into_iter()
            .map(Versioned::into_inner)
            .collect())
    }

    fn get_snapshot(&self, snapshot_id: &SnapshotId) -> StoreResult<Option<AttendanceSnapshot>> {
        let index_key = KeyPrefix::snapshot_index_key(snapshot_id);
        let Some(session_id) = self.owner(&index_key)? else {
            return Ok(None);
        };
        match self.read::<AttendanceSnapshot>(&KeyPrefix::snapshot_key(&session_id, snapshot_id))? {
            Some(snapshot) => Ok(Some(snapshot.into_inner())),
            None => Err(StoreError::DanglingIndex {
                key: display_key(&index_key),
            }),
        }
    }

    fn list_snapshots(&self, session_id: &SessionId) -> StoreResult<Vec<AttendanceSnapshot>> {
        let mut snapshots: Vec<AttendanceSnapshot> = self
            .scan::<AttendanceSnapshot>(&KeyPrefix::Snapshot.partition(session_id))?
            .into_iter()
            .map(Versioned::into_inner)
            .collect();
        snapshots.sort_by_key(|s| (s.taken_at, s.id));
        Ok(snapshots)
    }
}
