//! Scan outcomes

use pc_01_token_codec::CodecError;
use serde::Serialize;
use shared_types::{
    AttendanceRecord, Chain, ChainTokenWire, ParticipantId, ScanLogId, ScanResult, SessionId,
};

/// Result of one `process_scan` call.
///
/// Rejections are ordinary outcomes: the client re-polls for a fresh token on
/// `RejectedExpired`/`RejectedStale` and treats `AlreadyMarked` as done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub result: ScanResult,
    pub scanner_id: ParticipantId,
    pub session_id: Option<SessionId>,
    /// Chain after the hop, for chain tokens that got that far.
    pub chain: Option<Chain>,
    /// Token the scanner now holds (intermediate hops only).
    pub next_token: Option<ChainTokenWire>,
    /// Scanner's attendance after a successful mark.
    pub attendance: Option<AttendanceRecord>,
    /// Audit entry written for this scan, if the session was known.
    pub log_entry_id: Option<ScanLogId>,
    /// Human-readable rejection reason.
    pub reason: Option<String>,
}

impl ScanOutcome {
    pub(crate) fn new(result: ScanResult, scanner_id: ParticipantId) -> Self {
        Self {
            result,
            scanner_id,
            session_id: None,
            chain: None,
            next_token: None,
            attendance: None,
            log_entry_id: None,
            reason: None,
        }
    }

    /// Success, or a repeat of one that already succeeded.
    pub fn is_accepted(&self) -> bool {
        self.result.is_success() || self.result == ScanResult::AlreadyMarked
    }

    /// Client should fetch a fresh token and try again.
    pub fn should_refresh(&self) -> bool {
        matches!(
            self.result,
            ScanResult::RejectedExpired | ScanResult::RejectedStale
        )
    }
}

/// Audit result for a broadcast code the codec refused.
pub fn codec_rejection(err: &CodecError) -> ScanResult {
    match err {
        CodecError::Expired { .. } => ScanResult::RejectedExpired,
        _ => ScanResult::RejectedInvalid,
    }
}
