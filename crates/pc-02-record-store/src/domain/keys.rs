//! Key encoding

use shared_types::{ChainId, ParticipantId, ScanLogId, SessionId, SnapshotId, Timestamp, TokenId};

/// Key prefixes for the different record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// `c:{session}{chain_id}` -> Chain
    Chain,
    /// `t:{session}{token_id}` -> Token
    Token,
    /// `l:{session}{recorded_at}{log_id}` -> ScanLogEntry
    ScanLog,
    /// `a:{session}{student_id}` -> AttendanceRecord
    Attendance,
    /// `s:{session}{snapshot_id}` -> AttendanceSnapshot
    Snapshot,
    /// `ic:{chain_id}` -> SessionId
    ChainIndex,
    /// `is:{snapshot_id}` -> SessionId
    SnapshotIndex,
}

impl KeyPrefix {
    /// Get the byte prefix for this key type.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Chain => b"c:",
            KeyPrefix::Token => b"t:",
            KeyPrefix::ScanLog => b"l:",
            KeyPrefix::Attendance => b"a:",
            KeyPrefix::Snapshot => b"s:",
            KeyPrefix::ChainIndex => b"ic:",
            KeyPrefix::SnapshotIndex => b"is:",
        }
    }

    /// Prefix covering every record of this type in one session.
    pub fn partition(&self, session_id: &SessionId) -> Vec<u8> {
        let session = session_id.as_str().as_bytes();
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(&(session.len() as u32).to_be_bytes());
        key.extend_from_slice(session);
        key
    }

    /// Build a session-scoped key with the given suffix.
    pub fn key(&self, session_id: &SessionId, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.partition(session_id);
        key.extend_from_slice(suffix);
        key
    }

    pub fn chain_key(session_id: &SessionId, chain_id: &ChainId) -> Vec<u8> {
        KeyPrefix::Chain.key(session_id, chain_id.as_uuid().as_bytes())
    }

    pub fn token_key(session_id: &SessionId, token_id: &TokenId) -> Vec<u8> {
        KeyPrefix::Token.key(session_id, token_id.as_uuid().as_bytes())
    }

    /// Scan log keys sort by record time within a session.
    pub fn scan_log_key(session_id: &SessionId, recorded_at: Timestamp, id: &ScanLogId) -> Vec<u8> {
        let mut suffix = recorded_at.to_be_bytes().to_vec();
        suffix.extend_from_slice(id.as_uuid().as_bytes());
        KeyPrefix::ScanLog.key(session_id, &suffix)
    }

    pub fn attendance_key(session_id: &SessionId, student_id: &ParticipantId) -> Vec<u8> {
        KeyPrefix::Attendance.key(session_id, student_id.as_str().as_bytes())
    }

    pub fn snapshot_key(session_id: &SessionId, snapshot_id: &SnapshotId) -> Vec<u8> {
        KeyPrefix::Snapshot.key(session_id, snapshot_id.as_uuid().as_bytes())
    }

    pub fn chain_index_key(chain_id: &ChainId) -> Vec<u8> {
        let mut key = KeyPrefix::ChainIndex.as_bytes().to_vec();
        key.extend_from_slice(chain_id.as_uuid().as_bytes());
        key
    }

    pub fn snapshot_index_key(snapshot_id: &SnapshotId) -> Vec<u8> {
        let mut key = KeyPrefix::SnapshotIndex.as_bytes().to_vec();
        key.extend_from_slice(snapshot_id.as_uuid().as_bytes());
        key
    }
}
