//! Scan Processor Service
//!
//! Chain tokens are delegated to the Holder State Machine, which writes the
//! hop and its audit entry in one batch. Broadcast codes are verified here
//! and marked directly. Every rejection is appended to the scan log
//! separately so repeated abuse stays visible.

use crate::domain::{codec_rejection, PresentedToken, ScanContext, ScanOutcome};
use crate::error::{ProcessResult, ScanError};
use crate::ports::inbound::ScanProcessorApi;
use async_trait::async_trait;
use pc_01_token_codec::{BroadcastCodecApi, IssuedCode};
use pc_02_record_store::{RecordStoreApi, WriteBatch};
use pc_03_holder_chain::{HolderChainApi, NotifySink, TransferRequest};
use shared_bus::PresenceEvent;
use shared_types::{
    AttendanceRecord, Authorizer, Capability, ChainKind, ChainTokenWire, EntryMethod,
    IdentityClaim, ParticipantId, ScanLogEntry, ScanLogId, ScanResult, SessionId, TimeSource,
    Timestamp,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one direct-mark attempt.
enum DirectMark {
    Marked {
        record: AttendanceRecord,
        entry: ScanLogEntry,
    },
    AlreadyMarked,
}

/// Scan Processor implementation
pub struct ScanProcessorService<R, H, C, N, T>
where
    R: RecordStoreApi,
    H: HolderChainApi,
    C: BroadcastCodecApi,
    N: NotifySink,
    T: TimeSource,
{
    store: Arc<R>,
    holder: Arc<H>,
    codec: Arc<C>,
    notifier: Arc<N>,
    authorizer: Arc<dyn Authorizer>,
    time_source: Arc<T>,
}

impl<R, H, C, N, T> ScanProcessorService<R, H, C, N, T>
where
    R: RecordStoreApi,
    H: HolderChainApi,
    C: BroadcastCodecApi,
    N: NotifySink,
    T: TimeSource,
{
    pub fn new(
        store: Arc<R>,
        holder: Arc<H>,
        codec: Arc<C>,
        notifier: Arc<N>,
        authorizer: Arc<dyn Authorizer>,
        time_source: Arc<T>,
    ) -> Self {
        Self {
            store,
            holder,
            codec,
            notifier,
            authorizer,
            time_source,
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn audit_entry(
        session_id: &SessionId,
        scanner: &ParticipantId,
        result: ScanResult,
        now: Timestamp,
    ) -> ScanLogEntry {
        ScanLogEntry {
            id: ScanLogId::generate(),
            session_id: session_id.clone(),
            scanner_id: scanner.clone(),
            chain_id: None,
            token_id: None,
            snapshot_id: None,
            from_holder_id: None,
            sequence: None,
            result,
            recorded_at: now,
        }
    }

    fn log_rejection(scanner: &ParticipantId, result: ScanResult, reason: &str) {
        match result {
            ScanResult::RejectedExpired | ScanResult::RejectedStale | ScanResult::AlreadyMarked => {
                debug!(scanner = %scanner, result = result.label(), reason, "Scan rejected")
            }
            _ => info!(scanner = %scanner, result = result.label(), reason, "Scan rejected"),
        }
    }

    /// Append the audit entry for a rejected scan.
    fn reject(&self, entry: ScanLogEntry, reason: String) -> ProcessResult<ScanOutcome> {
        self.store
            .commit(WriteBatch::new().append_scan_log(entry.clone()))?;
        Self::log_rejection(&entry.scanner_id, entry.result, &reason);

        let mut outcome = ScanOutcome::new(entry.result, entry.scanner_id);
        outcome.session_id = Some(entry.session_id);
        outcome.log_entry_id = Some(entry.id);
        outcome.reason = Some(reason);
        Ok(outcome)
    }

    /// Reject under `session_id` if known, otherwise only trace it.
    fn reject_in(
        &self,
        session_id: Option<&SessionId>,
        scanner: &ParticipantId,
        result: ScanResult,
        reason: String,
    ) -> ProcessResult<ScanOutcome> {
        match session_id {
            Some(session_id) => {
                let entry = Self::audit_entry(session_id, scanner, result, self.time_source.now());
                self.reject(entry, reason)
            }
            None => {
                warn!(
                    scanner = %scanner,
                    result = result.label(),
                    reason,
                    "Scan rejected without a session, not audited"
                );
                let mut outcome = ScanOutcome::new(result, scanner.clone());
                outcome.reason = Some(reason);
                Ok(outcome)
            }
        }
    }

    // =========================================================================
    // CHAIN TOKENS
    // =========================================================================

    async fn scan_chain_token(
        &self,
        scanner: &ParticipantId,
        wire: ChainTokenWire,
        context: ScanContext,
    ) -> ProcessResult<ScanOutcome> {
        let now = self.time_source.now();
        let Some(chain) = self.store.get_chain(&wire.chain_id)?.map(|c| c.value) else {
            return self.reject_in(
                context.session_id.as_ref(),
                scanner,
                ScanResult::RejectedInvalid,
                format!("unknown chain {}", wire.chain_id),
            );
        };

        let mut entry = ScanLogEntry {
            chain_id: Some(chain.id),
            token_id: Some(wire.token_id),
            snapshot_id: chain.snapshot_id(),
            from_holder_id: Some(wire.holder_id.clone()),
            sequence: Some(wire.sequence),
            ..Self::audit_entry(&chain.session_id, scanner, ScanResult::RejectedInvalid, now)
        };

        if let Some(expected) = &context.session_id {
            if expected != &chain.session_id {
                return self.reject(entry, format!("token belongs to session {}", chain.session_id));
            }
        }

        // A finalized scanner gets the idempotent answer even after the chain closed
        if scanner != &wire.holder_id {
            if let Some(record) = self.store.get_attendance(&chain.session_id, scanner)? {
                if record.value.is_finalized_for(chain.kind) {
                    entry.result = ScanResult::AlreadyMarked;
                    return self.reject(entry, format!("already marked for {}", chain.kind));
                }
            }
        }

        let request = TransferRequest {
            chain_id: chain.id,
            from_holder: wire.holder_id,
            to_holder: scanner.clone(),
            consumed_token_id: wire.token_id,
            challenge_code: context.challenge_code,
        };

        match self.holder.transfer(request).await {
            Ok(receipt) => {
                let mut outcome = ScanOutcome::new(receipt.result, scanner.clone());
                outcome.session_id = Some(receipt.chain.session_id.clone());
                outcome.next_token = receipt.next_token.as_ref().map(|t| t.to_wire());
                outcome.chain = Some(receipt.chain);
                outcome.attendance = receipt.receiver_record;
                outcome.log_entry_id = Some(receipt.log_entry.id);
                Ok(outcome)
            }
            Err(e) => match e.scan_result() {
                Some(result) => {
                    entry.result = result;
                    self.reject(entry, e.to_string())
                }
                None => Err(e.into()),
            },
        }
    }

    // =========================================================================
    // BROADCAST CODES
    // =========================================================================

    fn try_mark_direct(
        &self,
        session_id: &SessionId,
        scanner: &ParticipantId,
        kind: ChainKind,
        now: Timestamp,
    ) -> ProcessResult<DirectMark> {
        let existing = self.store.get_attendance(session_id, scanner)?;
        let (mut record, version) = match existing {
            Some(existing) if existing.value.is_finalized_for(kind) => {
                return Ok(DirectMark::AlreadyMarked)
            }
            Some(existing) => (existing.value, Some(existing.version)),
            None => (
                AttendanceRecord::joined(session_id.clone(), scanner.clone(), now),
                None,
            ),
        };
        record.mark(kind, EntryMethod::DirectQr, now);

        let entry = Self::audit_entry(session_id, scanner, ScanResult::MarkedDirect, now);
        let batch = WriteBatch::new().append_scan_log(entry.clone());
        let batch = match version {
            Some(version) => batch.update_attendance(record.clone(), version),
            None => batch.create_attendance(record.clone()),
        };
        self.store.commit(batch)?;

        Ok(DirectMark::Marked { record, entry })
    }

    async fn scan_broadcast_code(
        &self,
        scanner: &ParticipantId,
        code: &str,
        context: ScanContext,
    ) -> ProcessResult<ScanOutcome> {
        let payload = match self.codec.verify(code) {
            Ok(payload) => payload,
            Err(e) => {
                // An expired code still names its session, so it is audited there
                let session_id = e.verified_session().or(context.session_id.as_ref());
                return self.reject_in(
                    session_id,
                    scanner,
                    codec_rejection(&e),
                    e.to_string(),
                )
            }
        };

        if let Some(expected) = &context.session_id {
            if expected != &payload.session_id {
                return self.reject_in(
                    Some(expected),
                    scanner,
                    ScanResult::RejectedInvalid,
                    format!("code belongs to session {}", payload.session_id),
                );
            }
        }
        let session_id = payload.session_id;
        let kind = payload.kind;
        if kind.direction().is_none() {
            return self.reject_in(
                Some(&session_id),
                scanner,
                ScanResult::RejectedInvalid,
                format!("{} codes mark nothing", kind),
            );
        }

        let now = self.time_source.now();
        let attempt = match self.try_mark_direct(&session_id, scanner, kind, now) {
            Err(ScanError::Store(e)) if e.is_conflict() => {
                debug!(session_id = %session_id, scanner = %scanner, "Direct mark conflict, retrying once");
                self.try_mark_direct(&session_id, scanner, kind, now)
            }
            other => other,
        };

        match attempt {
            Ok(DirectMark::Marked { record, entry }) => {
                info!(
                    session_id = %session_id,
                    scanner = %scanner,
                    kind = %kind,
                    "Attendance marked from broadcast code"
                );
                if let Err(e) = self
                    .notifier
                    .notify(PresenceEvent::AttendanceMarked {
                        session_id: session_id.clone(),
                        student_id: scanner.clone(),
                        kind,
                        method: EntryMethod::DirectQr,
                    })
                    .await
                {
                    warn!(error = %e, "Notify sink failed, observers fall back to polling");
                }

                let mut outcome = ScanOutcome::new(ScanResult::MarkedDirect, scanner.clone());
                outcome.session_id = Some(session_id);
                outcome.attendance = Some(record);
                outcome.log_entry_id = Some(entry.id);
                Ok(outcome)
            }
            Ok(DirectMark::AlreadyMarked) => self.reject_in(
                Some(&session_id),
                scanner,
                ScanResult::AlreadyMarked,
                format!("already marked for {}", kind),
            ),
            Err(ScanError::Store(e)) if e.is_conflict() => {
                warn!(session_id = %session_id, scanner = %scanner, "Direct mark conflict persisted after retry");
                self.reject_in(
                    Some(&session_id),
                    scanner,
                    ScanResult::RejectedStale,
                    e.to_string(),
                )
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<R, H, C, N, T> ScanProcessorApi for ScanProcessorService<R, H, C, N, T>
where
    R: RecordStoreApi + 'static,
    H: HolderChainApi + 'static,
    C: BroadcastCodecApi + 'static,
    N: NotifySink + 'static,
    T: TimeSource + 'static,
{
    async fn process_scan(
        &self,
        scanner: &IdentityClaim,
        presented: PresentedToken,
        context: ScanContext,
    ) -> ProcessResult<ScanOutcome> {
        let origin = presented.origin();
        if !self.authorizer.permits(scanner, Capability::Scan) {
            if let Some(session_id) = &context.session_id {
                let entry = Self::audit_entry(
                    session_id,
                    &scanner.subject,
                    ScanResult::Unauthorized,
                    self.time_source.now(),
                );
                self.store.commit(WriteBatch::new().append_scan_log(entry))?;
            }
            info!(scanner = %scanner.subject, origin = %origin, "Scan refused, caller lacks Scan");
            return Err(ScanError::Unauthorized {
                subject: scanner.subject.clone(),
                capability: Capability::Scan,
            });
        }

        let outcome = match presented {
            PresentedToken::Chain(wire) => {
                self.scan_chain_token(&scanner.subject, wire, context).await?
            }
            PresentedToken::Broadcast(code) => {
                self.scan_broadcast_code(&scanner.subject, &code, context)
                    .await?
            }
        };

        debug!(
            scanner = %scanner.subject,
            origin = %origin,
            result = outcome.result.label(),
            "Scan processed"
        );
        Ok(outcome)
    }

    async fn issue_broadcast_code(
        &self,
        issuer: &IdentityClaim,
        session_id: SessionId,
        kind: ChainKind,
    ) -> ProcessResult<IssuedCode> {
        if !self.authorizer.permits(issuer, Capability::ManageChains) {
            return Err(ScanError::Unauthorized {
                subject: issuer.subject.clone(),
                capability: Capability::ManageChains,
            });
        }
        if kind.direction().is_none() {
            return Err(ScanError::UnsupportedKind(kind));
        }

        let issued = self.codec.issue_for_kind(session_id.clone(), kind)?;
        debug!(
            session_id = %session_id,
            kind = %kind,
            expires_at = issued.expires_at,
            "Broadcast code issued"
        );
        Ok(issued)
    }
}
