//! Driving port (API - Inbound)

use crate::domain::{Versioned, WriteBatch};
use crate::error::StoreResult;
use shared_types::{
    AttendanceRecord, AttendanceSnapshot, Chain, ChainId, ParticipantId, ScanLogEntry, SessionId,
    SnapshotId, Token, TokenId,
};

/// Typed record store used by every protocol component.
pub trait RecordStoreApi: Send + Sync {
    /// Apply every write in `batch` atomically.
    ///
    /// Fails with `StoreError::Conflict` (writing nothing) if any create hits
    /// an existing record or any update's expected version is stale.
    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Chain by id, from any session.
    fn get_chain(&self, chain_id: &ChainId) -> StoreResult<Option<Versioned<Chain>>>;

    /// All chains of a session, ordered by creation time.
    fn list_chains(&self, session_id: &SessionId) -> StoreResult<Vec<Versioned<Chain>>>;

    fn get_token(
        &self,
        session_id: &SessionId,
        token_id: &TokenId,
    ) -> StoreResult<Option<Versioned<Token>>>;

    fn get_attendance(
        &self,
        session_id: &SessionId,
        student_id: &ParticipantId,
    ) -> StoreResult<Option<Versioned<AttendanceRecord>>>;

    /// The session roster, in enrolment order.
    fn list_attendance(&self, session_id: &SessionId) -> StoreResult<Vec<Versioned<AttendanceRecord>>>;

    /// Every scan attempt of a session, in record order.
    fn scan_log(&self, session_id: &SessionId) -> StoreResult<Vec<ScanLogEntry>>;

    /// Snapshot by id, from any session.
    fn get_snapshot(&self, snapshot_id: &SnapshotId) -> StoreResult<Option<AttendanceSnapshot>>;

    /// All snapshots of a session, ordered by capture time.
    fn list_snapshots(&self, session_id: &SessionId) -> StoreResult<Vec<AttendanceSnapshot>>;
}
