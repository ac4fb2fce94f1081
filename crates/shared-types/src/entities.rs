//! # Core Domain Entities
//!
//! Persisted record shapes for the chain-of-custody protocol.
//!
//! ## Clusters
//!
//! - **Chain lane**: `Chain`, `ChainKind`, `ChainPhase`, `ClosingRule`
//! - **Bearer secret**: `Token`, `TokenStatus`, `LivenessChallenge`, `ChainTokenWire`
//! - **Audit**: `ScanLogEntry`, `ScanResult`, `AttendanceSnapshot`
//! - **Attendance**: `AttendanceRecord`, `EntryMethod`, `EntryStatus`

use crate::errors::ParseError;
use crate::ids::{ChainId, ParticipantId, ScanLogId, SessionId, SnapshotId, TokenId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CLUSTER A: THE CHAIN LANE
// =============================================================================

/// Attendance direction a chain is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceDirection {
    Entry,
    Exit,
}

/// What a chain (or broadcast code) is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainKind {
    /// Regular arrival.
    Entry,
    /// Regular departure.
    Exit,
    /// Arrival after the late-entry toggle.
    Late,
    /// Departure before the session ends.
    Early,
    /// Spot-check capture; does not touch attendance records.
    Snapshot,
}

impl ChainKind {
    /// Every kind, in declaration order.
    pub const ALL: [ChainKind; 5] = [
        ChainKind::Entry,
        ChainKind::Exit,
        ChainKind::Late,
        ChainKind::Early,
        ChainKind::Snapshot,
    ];

    /// The attendance direction this kind finalizes, if any.
    pub fn direction(&self) -> Option<AttendanceDirection> {
        match self {
            ChainKind::Entry | ChainKind::Late => Some(AttendanceDirection::Entry),
            ChainKind::Exit | ChainKind::Early => Some(AttendanceDirection::Exit),
            ChainKind::Snapshot => None,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainKind::Entry => "ENTRY",
            ChainKind::Exit => "EXIT",
            ChainKind::Late => "LATE",
            ChainKind::Early => "EARLY",
            ChainKind::Snapshot => "SNAPSHOT",
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChainKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownChainKind(s.to_string()))
    }
}

/// Lifecycle phase of a chain.
///
/// ```text
/// [SEEDED] ──transfer──→ [ACTIVE] ──closing hop / close──→ [CLOSED]
///     │                                                        ↑
///     └──────────────────────── close ─────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainPhase {
    /// Initial holder assigned, no transfer yet.
    #[default]
    Seeded,
    /// At least one transfer has happened.
    Active,
    /// Terminal.
    Closed,
}

/// Condition under which a chain closes by itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosingRule {
    /// Only an explicit close ends the chain.
    #[default]
    Manual,
    /// The hop that hands the token to this participant closes the chain.
    ClosingParticipant(ParticipantId),
    /// The n-th transfer closes the chain.
    MaxHops(u64),
}

impl ClosingRule {
    /// Whether a transfer delivering to `receiver` as hop number `rotation`
    /// (the post-transfer rotation count) closes the chain.
    pub fn is_met(&self, receiver: &ParticipantId, rotation: u64) -> bool {
        match self {
            ClosingRule::Manual => false,
            ClosingRule::ClosingParticipant(closer) => closer == receiver,
            ClosingRule::MaxHops(limit) => rotation >= *limit,
        }
    }
}

/// Why a chain was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    /// The configured closing participant received the token.
    ClosingParticipantReached,
    /// The configured hop limit was reached.
    HopLimitReached,
    /// The teacher ended the chain explicitly.
    ForceEnded,
    /// The teacher ended the whole session.
    SessionEnded,
}

/// Marks a chain as belonging to a spot-check snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTag {
    pub snapshot_id: SnapshotId,
    /// Position of the chain within the snapshot (0-based).
    pub snapshot_index: u32,
}

/// One instance of a token-passing lane.
///
/// INVARIANTS:
/// - At most one live `current_token_id`.
/// - `rotation_count` strictly increases, by one per transfer.
/// - A `Closed` chain accepts no transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub id: ChainId,
    pub session_id: SessionId,
    pub kind: ChainKind,
    pub current_holder_id: ParticipantId,
    /// `None` once the chain is closed.
    pub current_token_id: Option<TokenId>,
    pub previous_token_id: Option<TokenId>,
    pub rotation_count: u64,
    pub phase: ChainPhase,
    pub closing_rule: ClosingRule,
    pub snapshot: Option<SnapshotTag>,
    pub created_at: Timestamp,
    pub closed_at: Option<Timestamp>,
    pub close_reason: Option<CloseReason>,
}

impl Chain {
    /// Whether the chain reached its terminal phase.
    pub fn is_closed(&self) -> bool {
        self.phase == ChainPhase::Closed
    }

    /// Snapshot this chain belongs to, if any.
    pub fn snapshot_id(&self) -> Option<SnapshotId> {
        self.snapshot.map(|tag| tag.snapshot_id)
    }
}

// =============================================================================
// CLUSTER B: THE BEARER SECRET
// =============================================================================

/// Secondary proof-of-presence layered on a token.
///
/// Only the keyed hash of the 6-digit code is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessChallenge {
    pub code_hash: [u8; 32],
    /// Participant who must answer the challenge.
    pub requester_id: ParticipantId,
    pub expires_at: Timestamp,
}

impl LivenessChallenge {
    /// Whether the challenge window has closed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// Where a token is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    /// Current bearer secret for its chain.
    #[default]
    Live,
    /// Spent by a successful scan.
    Consumed,
    /// Replaced by a refresh after expiry.
    Superseded,
    /// Retired because the chain closed.
    Revoked,
}

/// The bearer secret for one hop.
///
/// INVARIANTS:
/// - `expires_at > issued_at`.
/// - Single-use: once consumed it is never live again.
/// - `sequence` is the hop index within the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub chain_id: ChainId,
    pub session_id: SessionId,
    pub holder_id: ParticipantId,
    pub sequence: u64,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub status: TokenStatus,
    pub challenge: Option<LivenessChallenge>,
}

impl Token {
    /// Whether the TTL has elapsed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Live and unexpired.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.status == TokenStatus::Live && !self.is_expired(now)
    }

    /// Challenge that still gates this token, if any.
    pub fn pending_challenge(&self) -> Option<&LivenessChallenge> {
        self.challenge.as_ref()
    }

    /// Shape handed to the holder's client for QR rendering.
    pub fn to_wire(&self) -> ChainTokenWire {
        ChainTokenWire {
            token_id: self.id,
            chain_id: self.chain_id,
            holder_id: self.holder_id.clone(),
            sequence: self.sequence,
            expires_at: self.expires_at,
        }
    }
}

/// Persisted-chain token as it travels between devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTokenWire {
    pub token_id: TokenId,
    pub chain_id: ChainId,
    pub holder_id: ParticipantId,
    pub sequence: u64,
    pub expires_at: Timestamp,
}

// =============================================================================
// CLUSTER C: AUDIT
// =============================================================================

/// Outcome recorded for a single scan attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanResult {
    /// Intermediate hop: holder changed, successor token minted.
    Transferred,
    /// Closing hop: holder changed, chain closed.
    ChainCompleted,
    /// Broadcast code accepted.
    MarkedDirect,
    RejectedExpired,
    RejectedStale,
    RejectedInvalid,
    NotHolder,
    SelfTransfer,
    ChallengeFailed,
    ChainClosed,
    AlreadyMarked,
    Unauthorized,
}

impl ScanResult {
    /// Whether the scan changed protocol state.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ScanResult::Transferred | ScanResult::ChainCompleted | ScanResult::MarkedDirect
        )
    }

    /// Whether this result moved a chain token to a new holder.
    pub fn is_hop(&self) -> bool {
        matches!(self, ScanResult::Transferred | ScanResult::ChainCompleted)
    }

    /// Lower-case label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ScanResult::Transferred => "transferred",
            ScanResult::ChainCompleted => "chain_completed",
            ScanResult::MarkedDirect => "marked_direct",
            ScanResult::RejectedExpired => "rejected_expired",
            ScanResult::RejectedStale => "rejected_stale",
            ScanResult::RejectedInvalid => "rejected_invalid",
            ScanResult::NotHolder => "not_holder",
            ScanResult::SelfTransfer => "self_transfer",
            ScanResult::ChallengeFailed => "challenge_failed",
            ScanResult::ChainClosed => "chain_closed",
            ScanResult::AlreadyMarked => "already_marked",
            ScanResult::Unauthorized => "unauthorized",
        }
    }
}

/// Immutable audit record of one scan attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLogEntry {
    pub id: ScanLogId,
    pub session_id: SessionId,
    pub scanner_id: ParticipantId,
    /// `None` for broadcast codes and undecodable chain tokens.
    pub chain_id: Option<ChainId>,
    pub token_id: Option<TokenId>,
    pub snapshot_id: Option<SnapshotId>,
    /// Holder the token was taken from.
    pub from_holder_id: Option<ParticipantId>,
    /// Sequence of the presented token.
    pub sequence: Option<u64>,
    pub result: ScanResult,
    pub recorded_at: Timestamp,
}

/// Named, timestamped spot-check capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSnapshot {
    pub id: SnapshotId,
    pub session_id: SessionId,
    pub label: String,
    pub kind: ChainKind,
    pub taken_at: Timestamp,
    /// Chains in snapshot-index order.
    pub chain_ids: Vec<ChainId>,
    /// Seed holders in snapshot-index order.
    pub initial_holders: Vec<ParticipantId>,
    pub chains_created: u32,
    pub students_captured: u32,
}

// =============================================================================
// CLUSTER D: ATTENDANCE
// =============================================================================

/// How a direction was verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryMethod {
    DirectQr,
    Chain,
}

/// Entry verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    #[default]
    Absent,
    Present,
    Late,
}

/// Per-student, per-session attendance.
///
/// Each direction is finalized at most once and never rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub session_id: SessionId,
    pub student_id: ParticipantId,
    pub joined_at: Timestamp,
    pub entry_status: EntryStatus,
    pub entry_method: Option<EntryMethod>,
    pub entry_at: Option<Timestamp>,
    pub exit_verified: bool,
    pub exit_method: Option<EntryMethod>,
    pub exited_at: Option<Timestamp>,
    pub left_early: bool,
}

impl AttendanceRecord {
    /// Fresh record created when the student joins.
    pub fn joined(session_id: SessionId, student_id: ParticipantId, at: Timestamp) -> Self {
        Self {
            session_id,
            student_id,
            joined_at: at,
            entry_status: EntryStatus::Absent,
            entry_method: None,
            entry_at: None,
            exit_verified: false,
            exit_method: None,
            exited_at: None,
            left_early: false,
        }
    }

    /// Whether `direction` has already been finalized.
    pub fn is_finalized(&self, direction: AttendanceDirection) -> bool {
        match direction {
            AttendanceDirection::Entry => self.entry_at.is_some(),
            AttendanceDirection::Exit => self.exit_verified,
        }
    }

    /// Whether a scan of `kind` would be redundant for this student.
    pub fn is_finalized_for(&self, kind: ChainKind) -> bool {
        kind.direction()
            .map(|direction| self.is_finalized(direction))
            .unwrap_or(false)
    }

    /// Finalize the direction `kind` collects.
    ///
    /// Returns `false` (and changes nothing) if it was already finalized or
    /// the kind carries no direction.
    pub fn mark(&mut self, kind: ChainKind, method: EntryMethod, at: Timestamp) -> bool {
        let Some(direction) = kind.direction() else {
            return false;
        };
        if self.is_finalized(direction) {
            return false;
        }
        match direction {
            AttendanceDirection::Entry => {
                self.entry_status = if kind == ChainKind::Late {
                    EntryStatus::Late
                } else {
                    EntryStatus::Present
                };
                self.entry_method = Some(method);
                self.entry_at = Some(at);
            }
            AttendanceDirection::Exit => {
                self.exit_verified = true;
                self.exit_method = Some(method);
                self.exited_at = Some(at);
                self.left_early = kind == ChainKind::Early;
            }
        }
        true
    }
}
