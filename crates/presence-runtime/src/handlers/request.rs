//! Inbound request shapes.

use pc_04_scan_processor::{PresentedToken, ScanContext};
use serde::Deserialize;
use shared_types::{
    ChainId, ChainKind, CloseReason, ClosingRule, IdentityClaim, ParticipantId, SessionId,
    SnapshotId,
};

/// One line of input: who is asking, and what.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    /// Echoed back unchanged so clients can correlate responses.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Identity asserted by the external authentication service.
    pub caller: IdentityClaim,
    #[serde(flatten)]
    pub request: Request,
}

fn force_ended() -> CloseReason {
    CloseReason::ForceEnded
}

fn snapshot_kind() -> ChainKind {
    ChainKind::Snapshot
}

/// Inbound operations, tagged by `op`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    /// Caller enrols in a session.
    Join { session_id: SessionId },

    SeedChains {
        session_id: SessionId,
        kind: ChainKind,
        count: u32,
        #[serde(default)]
        closing_rule: ClosingRule,
    },

    /// Caller scans a presented token.
    Scan {
        token: PresentedToken,
        #[serde(default)]
        context: ScanContext,
    },

    /// Caller polls for the live token of a chain they hold.
    RefreshToken { chain_id: ChainId },

    IssueChallenge {
        chain_id: ChainId,
        holder_id: ParticipantId,
        requester_id: ParticipantId,
    },

    IssueBroadcastCode { session_id: SessionId, kind: ChainKind },

    CloseChain {
        chain_id: ChainId,
        #[serde(default = "force_ended")]
        reason: CloseReason,
    },

    /// Force-close every open chain of a session.
    CloseSession { session_id: SessionId },

    ListChains { session_id: SessionId },

    /// Defaults to the caller's own record.
    GetAttendance {
        session_id: SessionId,
        #[serde(default)]
        student_id: Option<ParticipantId>,
    },

    TakeSnapshot {
        session_id: SessionId,
        chain_count: u32,
        #[serde(default = "snapshot_kind")]
        kind: ChainKind,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        closing_rule: ClosingRule,
    },

    GetTrace { snapshot_id: SnapshotId },

    CompareSnapshots {
        snapshot_a: SnapshotId,
        snapshot_b: SnapshotId,
    },

    ListSnapshots { session_id: SessionId },

    /// Prometheus text exposition.
    Metrics,
}

impl Request {
    /// Operation name, as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Join { .. } => "join",
            Request::SeedChains { .. } => "seedChains",
            Request::Scan { .. } => "scan",
            Request::RefreshToken { .. } => "refreshToken",
            Request::IssueChallenge { .. } => "issueChallenge",
            Request::IssueBroadcastCode { .. } => "issueBroadcastCode",
            Request::CloseChain { .. } => "closeChain",
            Request::CloseSession { .. } => "closeSession",
            Request::ListChains { .. } => "listChains",
            Request::GetAttendance { .. } => "getAttendance",
            Request::TakeSnapshot { .. } => "takeSnapshot",
            Request::GetTrace { .. } => "getTrace",
            Request::CompareSnapshots { .. } => "compareSnapshots",
            Request::ListSnapshots { .. } => "listSnapshots",
            Request::Metrics => "metrics",
        }
    }
}
