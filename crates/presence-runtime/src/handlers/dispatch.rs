//! # Request Dispatch
//!
//! Routes each request to its component, after checking the caller's
//! capability, and turns outcomes into metrics.
//!
//! | Operation | Capability |
//! |-----------|------------|
//! | `join`, `refreshToken`, `scan` | `Scan` (checked by the scan processor for `scan`) |
//! | `issueChallenge` | `Scan`, and the caller must be the holder or the requester |
//! | `seedChains`, `closeChain`, `closeSession`, `takeSnapshot` | `ManageChains` |
//! | `issueBroadcastCode` | `ManageChains` (checked by the scan processor) |
//! | `getTrace`, `compareSnapshots`, `listSnapshots`, `metrics` | `ViewAudit` |
//! | `listChains` | any |
//! | `getAttendance` | `Scan` for one's own record, else `ViewAudit` |
//!
//! A challenge code is only returned to the holder. When the requester issues
//! it, the code is parked until the holder's next `refreshToken` poll for the
//! same token.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use pc_03_holder_chain::{HolderChainApi, IssuedChallenge, SeedRequest};
use pc_04_scan_processor::{ScanOutcome, ScanProcessorApi};
use pc_05_token_refresh::TokenRefreshApi;
use pc_06_snapshot_trace::{SnapshotRequest, SnapshotTraceApi};
use presence_telemetry::{
    encode_metrics, metric_inc, time_histogram, BROADCAST_CODES_ISSUED, CHAINS_CLOSED,
    CHAINS_SEEDED, SCANS_TOTAL, SCAN_DURATION, SNAPSHOTS_TAKEN, TOKENS_REFRESHED, TRANSFERS,
};
use shared_types::{
    Capability, ChainId, CloseReason, IdentityClaim, ScanResult, SystemTimeSource, TimeSource,
    TokenId,
};

use crate::container::ServiceContainer;
use crate::handlers::error::{HandlerError, HandlerResult};
use crate::handlers::request::{Request, RequestEnvelope};
use crate::handlers::response::{
    ChallengeView, RefreshView, ResponseEnvelope, SeededChainView, SnapshotView,
};

/// Metric label for a close reason.
pub fn close_reason_label(reason: &CloseReason) -> &'static str {
    match reason {
        CloseReason::ClosingParticipantReached => "closing_participant_reached",
        CloseReason::HopLimitReached => "hop_limit_reached",
        CloseReason::ForceEnded => "force_ended",
        CloseReason::SessionEnded => "session_ended",
    }
}

fn encode<S: Serialize>(value: &S) -> HandlerResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Turns requests into component calls.
pub struct RequestHandler<T: TimeSource + 'static = SystemTimeSource> {
    container: Arc<ServiceContainer<T>>,
    /// Challenges issued by a requester, waiting for the holder's poll.
    pending_challenges: Arc<Mutex<HashMap<ChainId, IssuedChallenge>>>,
}

impl<T: TimeSource + 'static> Clone for RequestHandler<T> {
    fn clone(&self) -> Self {
        Self {
            container: Arc::clone(&self.container),
            pending_challenges: Arc::clone(&self.pending_challenges),
        }
    }
}

impl<T: TimeSource + 'static> RequestHandler<T> {
    pub fn new(container: Arc<ServiceContainer<T>>) -> Self {
        Self {
            container,
            pending_challenges: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn container(&self) -> &Arc<ServiceContainer<T>> {
        &self.container
    }

    /// Parse and handle one input line.
    pub async fn handle_line(&self, line: &str) -> ResponseEnvelope {
        match serde_json::from_str::<RequestEnvelope>(line) {
            Ok(envelope) => self.handle(envelope).await,
            Err(e) => {
                debug!(error = %e, "Rejected malformed request");
                ResponseEnvelope::failure(None, &HandlerError::BadRequest(e.to_string()))
            }
        }
    }

    #[instrument(
        name = "request",
        skip_all,
        fields(op = envelope.request.name(), caller = %envelope.caller.subject)
    )]
    pub async fn handle(&self, envelope: RequestEnvelope) -> ResponseEnvelope {
        let RequestEnvelope {
            id,
            caller,
            request,
        } = envelope;

        match self.dispatch(&caller, request).await {
            Ok(result) => ResponseEnvelope::success(id, result),
            Err(e) => {
                if e.is_infrastructure() {
                    warn!(code = e.code(), error = %e, "Request failed");
                } else {
                    debug!(code = e.code(), error = %e, "Request refused");
                }
                ResponseEnvelope::failure(id, &e)
            }
        }
    }

    fn require(&self, caller: &IdentityClaim, capability: Capability) -> HandlerResult<()> {
        if self.container.authorizer.permits(caller, capability) {
            Ok(())
        } else {
            Err(HandlerError::Unauthorized {
                subject: caller.subject.clone(),
                capability,
            })
        }
    }

    /// Hand over the challenge parked for `chain_id` if it still guards `token_id`.
    ///
    /// Stale entries (expired, or for a token that has since been replaced)
    /// are dropped.
    fn take_pending_challenge(&self, chain_id: ChainId, token_id: TokenId) -> Option<ChallengeView> {
        let mut pending = self.pending_challenges.lock();
        let now = self.container.time_source.now();
        pending.retain(|_, issued| issued.expires_at > now);
        let issued = pending.remove(&chain_id)?;
        (issued.token_id == token_id).then(|| ChallengeView::from(issued))
    }

    async fn dispatch(&self, caller: &IdentityClaim, request: Request) -> HandlerResult<Value> {
        let services = &self.container;

        match request {
            // =================================================================
            // PARTICIPANT OPERATIONS
            // =================================================================
            Request::Join { session_id } => {
                self.require(caller, Capability::Scan)?;
                let record = services
                    .holder_chain
                    .join_session(&session_id, &caller.subject)
                    .await?;
                encode(&record)
            }

            Request::Scan { token, context } => {
                let _timer = time_histogram!(SCAN_DURATION);
                let outcome = services
                    .scan_processor
                    .process_scan(caller, token, context)
                    .await?;
                record_scan(&outcome);
                encode(&outcome)
            }

            Request::RefreshToken { chain_id } => {
                self.require(caller, Capability::Scan)?;
                let refreshed = services
                    .token_refresher
                    .get_or_refresh_token(chain_id, &caller.subject)
                    .await?;
                if refreshed.refreshed {
                    metric_inc!(TOKENS_REFRESHED);
                }
                let challenge = self.take_pending_challenge(chain_id, refreshed.token.id);
                encode(&RefreshView {
                    token: refreshed.to_wire(),
                    challenge,
                })
            }

            Request::GetAttendance {
                session_id,
                student_id,
            } => {
                let student_id = student_id.unwrap_or_else(|| caller.subject.clone());
                if student_id == caller.subject {
                    self.require(caller, Capability::Scan)?;
                } else {
                    self.require(caller, Capability::ViewAudit)?;
                }
                let record = services
                    .holder_chain
                    .get_attendance(&session_id, &student_id)
                    .await?;
                encode(&record)
            }

            Request::ListChains { session_id } => {
                if services.authorizer.capabilities(caller).is_empty() {
                    return Err(HandlerError::Unauthorized {
                        subject: caller.subject.clone(),
                        capability: Capability::Scan,
                    });
                }
                let chains = services.holder_chain.list_chains(&session_id).await?;
                encode(&chains)
            }

            // =================================================================
            // TEACHER OPERATIONS
            // =================================================================
            Request::SeedChains {
                session_id,
                kind,
                count,
                closing_rule,
            } => {
                self.require(caller, Capability::ManageChains)?;
                let seeded = services
                    .holder_chain
                    .seed(SeedRequest::new(session_id, kind, count).with_closing_rule(closing_rule))
                    .await?;
                CHAINS_SEEDED
                    .with_label_values(&[kind.as_str()])
                    .inc_by(seeded.len() as f64);
                let views: Vec<SeededChainView> = seeded.iter().map(SeededChainView::from).collect();
                encode(&views)
            }

            Request::IssueChallenge {
                chain_id,
                holder_id,
                requester_id,
            } => {
                self.require(caller, Capability::Scan)?;
                if caller.subject != holder_id && caller.subject != requester_id {
                    return Err(HandlerError::Unauthorized {
                        subject: caller.subject.clone(),
                        capability: Capability::Scan,
                    });
                }
                let issued = services
                    .holder_chain
                    .issue_challenge(chain_id, &holder_id, &requester_id)
                    .await?;
                if caller.subject == holder_id {
                    self.pending_challenges.lock().remove(&chain_id);
                    return encode(&ChallengeView::from(issued));
                }
                let view = ChallengeView::from(issued.clone()).withheld();
                self.pending_challenges.lock().insert(chain_id, issued);
                encode(&view)
            }

            Request::IssueBroadcastCode { session_id, kind } => {
                let issued = services
                    .scan_processor
                    .issue_broadcast_code(caller, session_id, kind)
                    .await?;
                metric_inc!(BROADCAST_CODES_ISSUED, &[kind.as_str()]);
                encode(&issued)
            }

            Request::CloseChain { chain_id, reason } => {
                self.require(caller, Capability::ManageChains)?;
                let chain = services.holder_chain.close(chain_id, reason.clone()).await?;
                metric_inc!(CHAINS_CLOSED, &[close_reason_label(&reason)]);
                encode(&chain)
            }

            Request::CloseSession { session_id } => {
                self.require(caller, Capability::ManageChains)?;
                let reason = CloseReason::SessionEnded;
                let closed = services
                    .holder_chain
                    .close_session_chains(&session_id, reason.clone())
                    .await?;
                services.event_bus.forget_session(&session_id);
                self.pending_challenges
                    .lock()
                    .retain(|chain_id, _| closed.iter().all(|chain| &chain.id != chain_id));
                CHAINS_CLOSED
                    .with_label_values(&[close_reason_label(&reason)])
                    .inc_by(closed.len() as f64);
                encode(&closed)
            }

            Request::TakeSnapshot {
                session_id,
                chain_count,
                kind,
                label,
                closing_rule,
            } => {
                self.require(caller, Capability::ManageChains)?;
                let mut snapshot_request = SnapshotRequest::new(session_id, chain_count)
                    .with_kind(kind)
                    .with_closing_rule(closing_rule);
                if let Some(label) = label {
                    snapshot_request = snapshot_request.with_label(label);
                }
                let taken = services.snapshot_trace.take_snapshot(snapshot_request).await?;
                metric_inc!(SNAPSHOTS_TAKEN);
                CHAINS_SEEDED
                    .with_label_values(&[kind.as_str()])
                    .inc_by(taken.chains.len() as f64);
                encode(&SnapshotView::from(&taken))
            }

            // =================================================================
            // AUDIT OPERATIONS
            // =================================================================
            Request::GetTrace { snapshot_id } => {
                self.require(caller, Capability::ViewAudit)?;
                let trace = services.snapshot_trace.get_trace(snapshot_id).await?;
                encode(&trace)
            }

            Request::CompareSnapshots {
                snapshot_a,
                snapshot_b,
            } => {
                self.require(caller, Capability::ViewAudit)?;
                let comparison = services
                    .snapshot_trace
                    .compare(snapshot_a, snapshot_b)
                    .await?;
                encode(&comparison)
            }

            Request::ListSnapshots { session_id } => {
                self.require(caller, Capability::ViewAudit)?;
                let snapshots = services.snapshot_trace.list_snapshots(&session_id).await?;
                encode(&snapshots)
            }

            Request::Metrics => {
                self.require(caller, Capability::ViewAudit)?;
                let text = encode_metrics().map_err(|e| HandlerError::Internal(e.to_string()))?;
                Ok(Value::String(text))
            }
        }
    }
}

fn record_scan(outcome: &ScanOutcome) {
    metric_inc!(SCANS_TOTAL, &[outcome.result.label()]);
    if outcome.result.is_hop() {
        metric_inc!(TRANSFERS);
    }
    if outcome.result == ScanResult::ChainCompleted {
        if let Some(reason) = outcome.chain.as_ref().and_then(|c| c.close_reason.as_ref()) {
            metric_inc!(CHAINS_CLOSED, &[close_reason_label(reason)]);
        }
    }
}
