//! Driving port (API - Inbound)

use crate::error::ChainResult;
use async_trait::async_trait;
use shared_types::{
    AttendanceRecord, Chain, ChainId, ChainKind, CloseReason, ClosingRule, ParticipantId,
    ScanLogEntry, ScanResult, SessionId, SnapshotId, Timestamp, Token, TokenId,
};

/// Request to bootstrap a set of chains.
#[derive(Debug, Clone)]
pub struct SeedRequest {
    pub session_id: SessionId,
    pub kind: ChainKind,
    pub count: u32,
    pub closing_rule: ClosingRule,
    /// Tag the chains as members of this snapshot.
    pub snapshot: Option<SnapshotId>,
}

impl SeedRequest {
    pub fn new(session_id: SessionId, kind: ChainKind, count: u32) -> Self {
        Self {
            session_id,
            kind,
            count,
            closing_rule: ClosingRule::Manual,
            snapshot: None,
        }
    }

    #[must_use]
    pub fn with_closing_rule(mut self, closing_rule: ClosingRule) -> Self {
        self.closing_rule = closing_rule;
        self
    }

    #[must_use]
    pub fn for_snapshot(mut self, snapshot_id: SnapshotId) -> Self {
        self.snapshot = Some(snapshot_id);
        self
    }
}

/// A freshly seeded chain and its sequence-0 token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededChain {
    pub chain: Chain,
    pub token: Token,
}

/// Request to move a chain's token to a new holder.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub chain_id: ChainId,
    pub from_holder: ParticipantId,
    pub to_holder: ParticipantId,
    pub consumed_token_id: TokenId,
    /// Answer to a pending liveness challenge.
    pub challenge_code: Option<String>,
}

/// Everything a successful transfer produced.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    /// Chain after the hop.
    pub chain: Chain,
    /// Token for the new holder; `None` when the hop closed the chain.
    pub next_token: Option<Token>,
    /// `Transferred` or `ChainCompleted`.
    pub result: ScanResult,
    /// Receiver's attendance after marking; `None` for snapshot chains.
    pub receiver_record: Option<AttendanceRecord>,
    pub log_entry: ScanLogEntry,
}

/// Plain challenge code handed to the current holder's client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    pub chain_id: ChainId,
    pub token_id: TokenId,
    pub requester_id: ParticipantId,
    pub code: String,
    pub expires_at: Timestamp,
}

/// Holder State Machine API
#[async_trait]
pub trait HolderChainApi: Send + Sync {
    /// Enrol a student; returns the existing record if already enrolled.
    async fn join_session(
        &self,
        session_id: &SessionId,
        student_id: &ParticipantId,
    ) -> ChainResult<AttendanceRecord>;

    /// Create `count` independent chains with distinct initial holders.
    ///
    /// Fails with `InvalidCount` if `count` is outside `1..=max` or exceeds
    /// the eligible participants.
    async fn seed(&self, request: SeedRequest) -> ChainResult<Vec<SeededChain>>;

    /// Hand the presented token to the scanner.
    async fn transfer(&self, request: TransferRequest) -> ChainResult<TransferReceipt>;

    /// Force a chain into CLOSED, revoking its outstanding token.
    async fn close(&self, chain_id: ChainId, reason: CloseReason) -> ChainResult<Chain>;

    /// Close every open chain of a session. Returns the chains this call closed.
    async fn close_session_chains(
        &self,
        session_id: &SessionId,
        reason: CloseReason,
    ) -> ChainResult<Vec<Chain>>;

    /// Attach a liveness challenge to the holder's current token.
    async fn issue_challenge(
        &self,
        chain_id: ChainId,
        holder_id: &ParticipantId,
        requester_id: &ParticipantId,
    ) -> ChainResult<IssuedChallenge>;

    async fn get_chain(&self, chain_id: ChainId) -> ChainResult<Chain>;

    async fn list_chains(&self, session_id: &SessionId) -> ChainResult<Vec<Chain>>;

    async fn get_attendance(
        &self,
        session_id: &SessionId,
        student_id: &ParticipantId,
    ) -> ChainResult<Option<AttendanceRecord>>;
}
