//! Holder Chain Service - Core business logic
//!
//! Every mutation is one conditional batch against the record store. A batch
//! that loses a race is re-validated from fresh reads and attempted once more.

use crate::domain::{
    check_transfer, mint_token, plan_hop, select_seed_holders, ChallengeHasher, TransferAttempt,
};
use crate::error::{ChainError, ChainResult};
use crate::ports::inbound::{
    HolderChainApi, IssuedChallenge, SeedRequest, SeededChain, TransferReceipt, TransferRequest,
};
use crate::ports::outbound::NotifySink;
use async_trait::async_trait;
use pc_02_record_store::{RecordStoreApi, StoreError, Versioned, WriteBatch};
use shared_bus::PresenceEvent;
use shared_crypto::SecretKey;
use shared_types::{
    secs_to_millis, AttendanceRecord, Chain, ChainId, ChainPhase, CloseReason, EntryMethod,
    KindTtl, ParticipantId, ScanLogEntry, ScanLogId, ScanResult, SessionId, SnapshotTag,
    TimeSource, TokenStatus, DEFAULT_TOKEN_TTL_SECS,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default liveness challenge window.
pub const DEFAULT_CHALLENGE_TTL_SECS: u64 = 30;

/// Default upper bound on chains per seed call.
pub const DEFAULT_MAX_CHAINS_PER_SEED: u32 = 10;

/// Holder chain configuration
#[derive(Clone, Debug)]
pub struct HolderChainConfig {
    /// Chain-token lifetime per kind (seconds)
    pub token_ttl: KindTtl,
    /// Liveness challenge lifetime (seconds)
    pub challenge_ttl_secs: u64,
    /// Upper bound for `count` in a seed request
    pub max_chains_per_seed: u32,
}

impl Default for HolderChainConfig {
    fn default() -> Self {
        Self {
            token_ttl: KindTtl::uniform(DEFAULT_TOKEN_TTL_SECS),
            challenge_ttl_secs: DEFAULT_CHALLENGE_TTL_SECS,
            max_chains_per_seed: DEFAULT_MAX_CHAINS_PER_SEED,
        }
    }
}

/// Holder State Machine implementation
pub struct HolderChainService<R, N, T>
where
    R: RecordStoreApi,
    N: NotifySink,
    T: TimeSource,
{
    config: HolderChainConfig,
    store: Arc<R>,
    notifier: Arc<N>,
    time_source: Arc<T>,
    challenges: ChallengeHasher,
}

impl<R, N, T> HolderChainService<R, N, T>
where
    R: RecordStoreApi,
    N: NotifySink,
    T: TimeSource,
{
    pub fn new(
        config: HolderChainConfig,
        secret: &SecretKey,
        store: Arc<R>,
        notifier: Arc<N>,
        time_source: Arc<T>,
    ) -> Self {
        Self {
            config,
            store,
            notifier,
            time_source,
            challenges: ChallengeHasher::new(secret),
        }
    }

    pub fn config(&self) -> &HolderChainConfig {
        &self.config
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn load_chain(&self, chain_id: ChainId) -> ChainResult<Versioned<Chain>> {
        self.store
            .get_chain(&chain_id)?
            .ok_or(ChainError::ChainNotFound(chain_id))
    }

    /// Run `attempt`; on a store conflict run it once more from fresh reads.
    fn with_retry<O>(
        &self,
        resource: impl Fn() -> String,
        mut attempt: impl FnMut() -> ChainResult<O>,
    ) -> ChainResult<O> {
        match attempt() {
            Err(ChainError::Store(e)) if e.is_conflict() => {
                debug!(resource = %resource(), "Write conflict, retrying once");
                match attempt() {
                    Err(ChainError::Store(e)) if e.is_conflict() => {
                        warn!(resource = %resource(), "Write conflict persisted after retry");
                        Err(ChainError::StoreConflict {
                            resource: resource(),
                        })
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Fire-and-forget delivery to the notify sink.
    async fn announce(&self, event: PresenceEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.notifier.notify(event).await {
            warn!(event_type, error = %e, "Notify sink failed, observers fall back to polling");
        }
    }

    fn log_rejection(err: &ChainError, request: &TransferRequest) {
        if err.is_routine() {
            debug!(
                chain_id = %request.chain_id,
                scanner = %request.to_holder,
                error = %err,
                "Transfer rejected"
            );
        } else {
            info!(
                chain_id = %request.chain_id,
                scanner = %request.to_holder,
                error = %err,
                "Transfer rejected"
            );
        }
    }

    // =========================================================================
    // SINGLE ATTEMPTS
    // =========================================================================

    fn try_seed(&self, request: &SeedRequest) -> ChainResult<(Vec<SeededChain>, Vec<AttendanceRecord>)> {
        let now = self.time_source.now();
        let roster = self.store.list_attendance(&request.session_id)?;
        let records: Vec<AttendanceRecord> = roster.iter().map(|r| r.value.clone()).collect();
        let holders = select_seed_holders(
            &records,
            request.kind,
            request.count,
            self.config.max_chains_per_seed,
        )?;

        let ttl_ms = self.config.token_ttl.millis(request.kind);
        let mut batch = WriteBatch::new();
        let mut seeded = Vec::with_capacity(holders.len());

        for (index, holder) in holders.iter().enumerate() {
            let mut chain = Chain {
                id: ChainId::generate(),
                session_id: request.session_id.clone(),
                kind: request.kind,
                current_holder_id: holder.clone(),
                current_token_id: None,
                previous_token_id: None,
                rotation_count: 0,
                phase: ChainPhase::Seeded,
                closing_rule: request.closing_rule.clone(),
                snapshot: request.snapshot.map(|snapshot_id| SnapshotTag {
                    snapshot_id,
                    snapshot_index: index as u32,
                }),
                created_at: now,
                closed_at: None,
                close_reason: None,
            };
            let token = mint_token(&chain, holder, 0, now, ttl_ms);
            chain.current_token_id = Some(token.id);

            batch = batch.create_chain(chain.clone()).create_token(token.clone());
            seeded.push(SeededChain { chain, token });
        }

        // Seed holders are physically present; snapshot chains never mark
        let mut marked = Vec::new();
        for entry in roster.iter().filter(|r| holders.contains(&r.value.student_id)) {
            let mut record = entry.value.clone();
            if record.mark(request.kind, EntryMethod::Chain, now) {
                batch = batch.update_attendance(record.clone(), entry.version);
                marked.push(record);
            }
        }

        self.store.commit(batch)?;
        Ok((seeded, marked))
    }

    fn try_transfer(&self, request: &TransferRequest) -> ChainResult<TransferReceipt> {
        let now = self.time_source.now();
        let chain = self.load_chain(request.chain_id)?;
        let session_id = chain.value.session_id.clone();
        let token = self
            .store
            .get_token(&session_id, &request.consumed_token_id)?;

        let attempt = TransferAttempt {
            from: &request.from_holder,
            to: &request.to_holder,
            presented: request.consumed_token_id,
            now,
        };
        check_transfer(&chain.value, token.as_ref().map(|t| &t.value), &attempt)?;
        let token = token.ok_or(ChainError::UnknownToken {
            chain_id: request.chain_id,
        })?;

        // A failed challenge leaves the token untouched for another try
        self.challenges.check(
            &token.value,
            &request.to_holder,
            request.challenge_code.as_deref(),
            now,
        )?;

        let kind = chain.value.kind;
        let receiver = self.store.get_attendance(&session_id, &request.to_holder)?;
        let marks_attendance = kind.direction().is_some();
        if marks_attendance {
            if let Some(existing) = &receiver {
                if existing.value.is_finalized_for(kind) {
                    return Err(ChainError::AlreadyMarked {
                        session_id,
                        participant: request.to_holder.clone(),
                    });
                }
            }
        }

        let plan = plan_hop(
            &chain.value,
            &token.value,
            &request.to_holder,
            now,
            self.config.token_ttl.millis(kind),
        );

        let log_entry = ScanLogEntry {
            id: ScanLogId::generate(),
            session_id: session_id.clone(),
            scanner_id: request.to_holder.clone(),
            chain_id: Some(chain.value.id),
            token_id: Some(token.value.id),
            snapshot_id: chain.value.snapshot_id(),
            from_holder_id: Some(request.from_holder.clone()),
            sequence: Some(token.value.sequence),
            result: plan.result,
            recorded_at: now,
        };

        let mut batch = WriteBatch::new()
            .update_chain(plan.chain.clone(), chain.version)
            .update_token(plan.consumed.clone(), token.version)
            .append_scan_log(log_entry.clone());
        if let Some(successor) = &plan.successor {
            batch = batch.create_token(successor.clone());
        }

        let receiver_record = if marks_attendance {
            let (mut record, version) = match receiver {
                Some(existing) => (existing.value, Some(existing.version)),
                // Scanning in enrols a participant the roster has not seen yet
                None => (
                    AttendanceRecord::joined(session_id.clone(), request.to_holder.clone(), now),
                    None,
                ),
            };
            record.mark(kind, EntryMethod::Chain, now);
            batch = match version {
                Some(version) => batch.update_attendance(record.clone(), version),
                None => batch.create_attendance(record.clone()),
            };
            Some(record)
        } else {
            None
        };

        self.store.commit(batch)?;

        Ok(TransferReceipt {
            chain: plan.chain,
            next_token: plan.successor,
            result: plan.result,
            receiver_record,
            log_entry,
        })
    }

    fn try_close(&self, chain_id: ChainId, reason: &CloseReason) -> ChainResult<Chain> {
        let now = self.time_source.now();
        let chain = self.load_chain(chain_id)?;
        if chain.value.is_closed() {
            return Err(ChainError::ChainClosed(chain_id));
        }

        let mut closed = chain.value.clone();
        closed.phase = ChainPhase::Closed;
        closed.closed_at = Some(now);
        closed.close_reason = Some(reason.clone());

        let mut batch = WriteBatch::new();
        if let Some(token_id) = chain.value.current_token_id {
            if let Some(token) = self.store.get_token(&chain.value.session_id, &token_id)? {
                let mut revoked = token.value;
                revoked.status = TokenStatus::Revoked;
                batch = batch.update_token(revoked, token.version);
            }
            closed.previous_token_id = Some(token_id);
            closed.current_token_id = None;
        }
        batch = batch.update_chain(closed.clone(), chain.version);

        self.store.commit(batch)?;
        Ok(closed)
    }

    fn try_issue_challenge(
        &self,
        chain_id: ChainId,
        holder_id: &ParticipantId,
        requester_id: &ParticipantId,
    ) -> ChainResult<IssuedChallenge> {
        let now = self.time_source.now();
        let chain = self.load_chain(chain_id)?.value;
        if chain.is_closed() {
            return Err(ChainError::ChainClosed(chain_id));
        }
        if &chain.current_holder_id != holder_id {
            return Err(ChainError::NotHolder {
                chain_id,
                claimed: holder_id.clone(),
            });
        }
        if requester_id == holder_id {
            return Err(ChainError::SelfTransfer {
                participant: requester_id.clone(),
            });
        }

        let token_id = chain
            .current_token_id
            .ok_or(ChainError::StaleToken { chain_id })?;
        let token = self
            .store
            .get_token(&chain.session_id, &token_id)?
            .ok_or(ChainError::UnknownToken { chain_id })?;
        if token.value.status != TokenStatus::Live {
            return Err(ChainError::StaleToken { chain_id });
        }
        if token.value.is_expired(now) {
            return Err(ChainError::Expired {
                expires_at: token.value.expires_at,
            });
        }

        let code = ChallengeHasher::generate_code();
        let expires_at = now.saturating_add(secs_to_millis(self.config.challenge_ttl_secs));
        let mut challenged = token.value.clone();
        challenged.challenge = Some(self.challenges.challenge_for(
            &challenged,
            &code,
            requester_id.clone(),
            expires_at,
        ));

        self.store
            .commit(WriteBatch::new().update_token(challenged, token.version))?;

        Ok(IssuedChallenge {
            chain_id,
            token_id,
            requester_id: requester_id.clone(),
            code,
            expires_at,
        })
    }
}

#[async_trait]
impl<R, N, T> HolderChainApi for HolderChainService<R, N, T>
where
    R: RecordStoreApi + 'static,
    N: NotifySink + 'static,
    T: TimeSource + 'static,
{
    async fn join_session(
        &self,
        session_id: &SessionId,
        student_id: &ParticipantId,
    ) -> ChainResult<AttendanceRecord> {
        if let Some(existing) = self.store.get_attendance(session_id, student_id)? {
            return Ok(existing.value);
        }

        let record =
            AttendanceRecord::joined(session_id.clone(), student_id.clone(), self.time_source.now());
        match self
            .store
            .commit(WriteBatch::new().create_attendance(record.clone()))
        {
            Ok(()) => {
                info!(session_id = %session_id, student = %student_id, "Participant joined");
                Ok(record)
            }
            // A concurrent join won; theirs is as good as ours
            Err(StoreError::Conflict { .. }) => self
                .store
                .get_attendance(session_id, student_id)?
                .map(Versioned::into_inner)
                .ok_or_else(|| ChainError::StoreConflict {
                    resource: format!("attendance {}/{}", session_id, student_id),
                }),
            Err(e) => Err(e.into()),
        }
    }

    async fn seed(&self, request: SeedRequest) -> ChainResult<Vec<SeededChain>> {
        let (seeded, marked) = self.with_retry(
            || format!("session {} roster", request.session_id),
            || self.try_seed(&request),
        )?;

        info!(
            session_id = %request.session_id,
            kind = %request.kind,
            chains = seeded.len(),
            snapshot = ?request.snapshot,
            "Chains seeded"
        );

        self.announce(PresenceEvent::ChainsSeeded {
            session_id: request.session_id.clone(),
            kind: request.kind,
            chain_ids: seeded.iter().map(|s| s.chain.id).collect(),
        })
        .await;
        for record in marked {
            self.announce(PresenceEvent::AttendanceMarked {
                session_id: record.session_id,
                student_id: record.student_id,
                kind: request.kind,
                method: EntryMethod::Chain,
            })
            .await;
        }

        Ok(seeded)
    }

    async fn transfer(&self, request: TransferRequest) -> ChainResult<TransferReceipt> {
        let receipt = match self.with_retry(
            || format!("chain {}", request.chain_id),
            || self.try_transfer(&request),
        ) {
            Ok(receipt) => receipt,
            Err(e) => {
                Self::log_rejection(&e, &request);
                return Err(e);
            }
        };

        let chain = &receipt.chain;
        info!(
            chain_id = %chain.id,
            session_id = %chain.session_id,
            holder = %chain.current_holder_id,
            rotation = chain.rotation_count,
            result = receipt.result.label(),
            "Token transferred"
        );

        let event = match receipt.result {
            ScanResult::ChainCompleted => PresenceEvent::ChainClosed {
                session_id: chain.session_id.clone(),
                chain_id: chain.id,
                final_holder_id: chain.current_holder_id.clone(),
                rotation_count: chain.rotation_count,
                reason: chain
                    .close_reason
                    .clone()
                    .unwrap_or(CloseReason::ForceEnded),
            },
            _ => PresenceEvent::HolderChanged {
                session_id: chain.session_id.clone(),
                chain_id: chain.id,
                new_holder_id: chain.current_holder_id.clone(),
                rotation_count: chain.rotation_count,
            },
        };
        self.announce(event).await;

        if receipt.receiver_record.is_some() {
            self.announce(PresenceEvent::AttendanceMarked {
                session_id: chain.session_id.clone(),
                student_id: chain.current_holder_id.clone(),
                kind: chain.kind,
                method: EntryMethod::Chain,
            })
            .await;
        }

        Ok(receipt)
    }

    async fn close(&self, chain_id: ChainId, reason: CloseReason) -> ChainResult<Chain> {
        let closed = self.with_retry(
            || format!("chain {}", chain_id),
            || self.try_close(chain_id, &reason),
        )?;

        info!(
            chain_id = %closed.id,
            session_id = %closed.session_id,
            rotation = closed.rotation_count,
            reason = ?reason,
            "Chain closed"
        );

        self.announce(PresenceEvent::ChainClosed {
            session_id: closed.session_id.clone(),
            chain_id: closed.id,
            final_holder_id: closed.current_holder_id.clone(),
            rotation_count: closed.rotation_count,
            reason,
        })
        .await;

        Ok(closed)
    }

    async fn close_session_chains(
        &self,
        session_id: &SessionId,
        reason: CloseReason,
    ) -> ChainResult<Vec<Chain>> {
        let open: Vec<ChainId> = self
            .store
            .list_chains(session_id)?
            .into_iter()
            .filter(|c| !c.value.is_closed())
            .map(|c| c.value.id)
            .collect();

        let mut closed = Vec::with_capacity(open.len());
        for chain_id in open {
            match self.close(chain_id, reason.clone()).await {
                Ok(chain) => closed.push(chain),
                // Closed by a final hop in the meantime
                Err(ChainError::ChainClosed(_)) => {}
                Err(e) => return Err(e),
            }
        }

        info!(session_id = %session_id, closed = closed.len(), "Session chains closed");
        Ok(closed)
    }

    async fn issue_challenge(
        &self,
        chain_id: ChainId,
        holder_id: &ParticipantId,
        requester_id: &ParticipantId,
    ) -> ChainResult<IssuedChallenge> {
        let issued = self.with_retry(
            || format!("chain {}", chain_id),
            || self.try_issue_challenge(chain_id, holder_id, requester_id),
        )?;

        info!(
            chain_id = %chain_id,
            holder = %holder_id,
            requester = %requester_id,
            expires_at = issued.expires_at,
            "Liveness challenge issued"
        );
        Ok(issued)
    }

    async fn get_chain(&self, chain_id: ChainId) -> ChainResult<Chain> {
        Ok(self.load_chain(chain_id)?.value)
    }

    async fn list_chains(&self, session_id: &SessionId) -> ChainResult<Vec<Chain>> {
        Ok(self
            .store
            .list_chains(session_id)?
            .into_iter()
            .map(Versioned::into_inner)
            .collect())
    }

    async fn get_attendance(
        &self,
        session_id: &SessionId,
        student_id: &ParticipantId,
    ) -> ChainResult<Option<AttendanceRecord>> {
        Ok(self
            .store
            .get_attendance(session_id, student_id)?
            .map(Versioned::into_inner))
    }
}

#[cfg(test)]
mod tests;
