//! Typed write batches

use shared_types::{AttendanceRecord, AttendanceSnapshot, Chain, ScanLogEntry, Token};

/// Record version assigned by the store.
pub type Version = u64;

/// A record together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: Version,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(version: Version, value: T) -> Self {
        Self { version, value }
    }

    /// Drop the version.
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// One typed write.
#[derive(Debug, Clone)]
pub enum RecordWrite {
    CreateChain(Chain),
    UpdateChain { chain: Chain, expected: Version },
    CreateToken(Token),
    UpdateToken { token: Token, expected: Version },
    AppendScanLog(ScanLogEntry),
    CreateAttendance(AttendanceRecord),
    UpdateAttendance { record: AttendanceRecord, expected: Version },
    CreateSnapshot(AttendanceSnapshot),
}

/// Writes committed together or not at all.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<RecordWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_chain(mut self, chain: Chain) -> Self {
        self.writes.push(RecordWrite::CreateChain(chain));
        self
    }

    pub fn update_chain(mut self, chain: Chain, expected: Version) -> Self {
        self.writes.push(RecordWrite::UpdateChain { chain, expected });
        self
    }

    pub fn create_token(mut self, token: Token) -> Self {
        self.writes.push(RecordWrite::CreateToken(token));
        self
    }

    pub fn update_token(mut self, token: Token, expected: Version) -> Self {
        self.writes.push(RecordWrite::UpdateToken { token, expected });
        self
    }

    pub fn append_scan_log(mut self, entry: ScanLogEntry) -> Self {
        self.writes.push(RecordWrite::AppendScanLog(entry));
        self
    }

    pub fn create_attendance(mut self, record: AttendanceRecord) -> Self {
        self.writes.push(RecordWrite::CreateAttendance(record));
        self
    }

    pub fn update_attendance(mut self, record: AttendanceRecord, expected: Version) -> Self {
        self.writes.push(RecordWrite::UpdateAttendance { record, expected });
        self
    }

    pub fn create_snapshot(mut self, snapshot: AttendanceSnapshot) -> Self {
        self.writes.push(RecordWrite::CreateSnapshot(snapshot));
        self
    }

    /// Append a write in place.
    pub fn push(&mut self, write: RecordWrite) {
        self.writes.push(write);
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn into_writes(self) -> Vec<RecordWrite> {
        self.writes
    }
}
