//! Holder chain service tests

use super::*;
use crate::adapters::RecordingNotifySink;
use pc_02_record_store::test_utils::ContendedStore;
use pc_02_record_store::{ChainRecordStore, InMemoryKVStore};
use shared_types::{ChainKind, ClosingRule, EntryStatus, ManualTimeSource, SnapshotId, TokenId};

const T0: u64 = 1_700_000_000_000;

type TestStore = ChainRecordStore<ContendedStore<InMemoryKVStore>>;
type TestService = HolderChainService<TestStore, RecordingNotifySink, ManualTimeSource>;

struct Fixture {
    service: TestService,
    store: Arc<TestStore>,
    kv: Arc<ContendedStore<InMemoryKVStore>>,
    notifier: Arc<RecordingNotifySink>,
    clock: Arc<ManualTimeSource>,
    session: SessionId,
}

fn p(name: &str) -> ParticipantId {
    ParticipantId::from(name)
}

async fn create_test_service(students: &[&str]) -> Fixture {
    let kv = Arc::new(ContendedStore::new(Arc::new(InMemoryKVStore::new())));
    let store = Arc::new(ChainRecordStore::new(kv.clone()));
    let notifier = Arc::new(RecordingNotifySink::new());
    let clock = Arc::new(ManualTimeSource::new(T0));
    let service = HolderChainService::new(
        HolderChainConfig::default(),
        &SecretKey::from_bytes([7; 32]),
        store.clone(),
        notifier.clone(),
        clock.clone(),
    );
    let session = SessionId::from("cs101");

    for name in students {
        service.join_session(&session, &p(name)).await.unwrap();
        clock.advance(1);
    }
    notifier.clear();

    Fixture {
        service,
        store,
        kv,
        notifier,
        clock,
        session,
    }
}

async fn seed_one(fx: &Fixture, kind: ChainKind, rule: ClosingRule) -> SeededChain {
    fx.service
        .seed(SeedRequest::new(fx.session.clone(), kind, 1).with_closing_rule(rule))
        .await
        .unwrap()
        .remove(0)
}

fn transfer(seeded: &SeededChain, to: &str) -> TransferRequest {
    TransferRequest {
        chain_id: seeded.chain.id,
        from_holder: seeded.token.holder_id.clone(),
        to_holder: p(to),
        consumed_token_id: seeded.token.id,
        challenge_code: None,
    }
}

// =============================================================================
// ENROLMENT AND SEEDING
// =============================================================================

#[tokio::test]
async fn test_join_is_idempotent() {
    let fx = create_test_service(&["alice"]).await;
    fx.clock.advance(5_000);

    let again = fx.service.join_session(&fx.session, &p("alice")).await.unwrap();
    assert_eq!(again.joined_at, T0);
    assert_eq!(fx.store.list_attendance(&fx.session).unwrap().len(), 1);
}

#[tokio::test]
async fn test_seed_assigns_distinct_holders_in_join_order() {
    let fx = create_test_service(&["alice", "bob", "carol"]).await;

    let seeded = fx
        .service
        .seed(SeedRequest::new(fx.session.clone(), ChainKind::Entry, 2))
        .await
        .unwrap();

    assert_eq!(seeded.len(), 2);
    assert_eq!(seeded[0].chain.current_holder_id, p("alice"));
    assert_eq!(seeded[1].chain.current_holder_id, p("bob"));
    for s in &seeded {
        assert_eq!(s.chain.phase, ChainPhase::Seeded);
        assert_eq!(s.chain.rotation_count, 0);
        assert_eq!(s.token.sequence, 0);
        assert_eq!(s.token.expires_at - s.token.issued_at, 10_000);
        assert_eq!(s.chain.current_token_id, Some(s.token.id));
    }
}

#[tokio::test]
async fn test_seed_marks_initial_holders() {
    let fx = create_test_service(&["alice", "bob"]).await;
    seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    let alice = fx
        .service
        .get_attendance(&fx.session, &p("alice"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alice.entry_status, EntryStatus::Present);
    assert_eq!(alice.entry_method, Some(EntryMethod::Chain));

    let events = fx.notifier.events();
    assert!(matches!(events[0], PresenceEvent::ChainsSeeded { .. }));
    assert!(matches!(events[1], PresenceEvent::AttendanceMarked { .. }));
}

#[tokio::test]
async fn test_seed_skips_already_marked() {
    let fx = create_test_service(&["alice", "bob"]).await;
    seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    let second = seed_one(&fx, ChainKind::Late, ClosingRule::Manual).await;
    assert_eq!(second.chain.current_holder_id, p("bob"));
    let bob = fx.store.get_attendance(&fx.session, &p("bob")).unwrap().unwrap();
    assert_eq!(bob.value.entry_status, EntryStatus::Late);

    // Nobody left to seed an entry-direction chain
    let result = fx
        .service
        .seed(SeedRequest::new(fx.session.clone(), ChainKind::Entry, 1))
        .await;
    assert!(matches!(result, Err(ChainError::InvalidCount { eligible: 0, .. })));
}

#[tokio::test]
async fn test_seed_count_bounds() {
    let fx = create_test_service(&["alice", "bob"]).await;

    for count in [0, 3, 11] {
        let result = fx
            .service
            .seed(SeedRequest::new(fx.session.clone(), ChainKind::Entry, count))
            .await;
        assert!(matches!(result, Err(ChainError::InvalidCount { .. })), "count {count}");
    }
    assert!(fx.service.list_chains(&fx.session).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_snapshot_seed_is_tagged_and_marks_nobody() {
    let fx = create_test_service(&["alice", "bob"]).await;
    let snapshot_id = SnapshotId::generate();

    let seeded = fx
        .service
        .seed(SeedRequest::new(fx.session.clone(), ChainKind::Snapshot, 2).for_snapshot(snapshot_id))
        .await
        .unwrap();

    assert_eq!(seeded[1].chain.snapshot_id(), Some(snapshot_id));
    assert_eq!(seeded[1].chain.snapshot.unwrap().snapshot_index, 1);
    let alice = fx.store.get_attendance(&fx.session, &p("alice")).unwrap().unwrap();
    assert_eq!(alice.value.entry_status, EntryStatus::Absent);
}

// =============================================================================
// TRANSFER
// =============================================================================

#[tokio::test]
async fn test_single_hop() {
    let fx = create_test_service(&["h0", "h1"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;
    fx.notifier.clear();
    fx.clock.advance(3_000);

    let receipt = fx.service.transfer(transfer(&seeded, "h1")).await.unwrap();

    assert_eq!(receipt.result, ScanResult::Transferred);
    assert_eq!(receipt.chain.phase, ChainPhase::Active);
    assert_eq!(receipt.chain.rotation_count, 1);
    assert_eq!(receipt.chain.current_holder_id, p("h1"));
    let next = receipt.next_token.unwrap();
    assert_eq!(next.sequence, 1);
    assert_eq!(next.holder_id, p("h1"));

    let log = fx.store.scan_log(&fx.session).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].result, ScanResult::Transferred);
    assert_eq!(log[0].from_holder_id, Some(p("h0")));
    assert_eq!(log[0].sequence, Some(0));

    let h1 = receipt.receiver_record.unwrap();
    assert_eq!(h1.entry_method, Some(EntryMethod::Chain));

    let events = fx.notifier.events();
    assert!(matches!(
        &events[0],
        PresenceEvent::HolderChanged { rotation_count: 1, .. }
    ));
    assert!(matches!(&events[1], PresenceEvent::AttendanceMarked { .. }));
}

#[tokio::test]
async fn test_replay_is_stale() {
    let fx = create_test_service(&["h0", "h1", "h2"]).await;
    let seeded = seed_one(&fx, ChainKind::Exit, ClosingRule::Manual).await;

    fx.service.transfer(transfer(&seeded, "h1")).await.unwrap();
    let replay = fx.service.transfer(transfer(&seeded, "h2")).await;

    assert!(matches!(replay, Err(ChainError::StaleToken { .. })));
    let chain = fx.service.get_chain(seeded.chain.id).await.unwrap();
    assert_eq!(chain.rotation_count, 1);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let fx = create_test_service(&["h0", "h1"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    fx.clock.advance_secs(10);
    let result = fx.service.transfer(transfer(&seeded, "h1")).await;
    assert!(matches!(result, Err(ChainError::Expired { .. })));
    assert!(fx.store.scan_log(&fx.session).unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_holder_and_self_transfer() {
    let fx = create_test_service(&["h0", "h1", "mallory"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    let mut forged = transfer(&seeded, "h1");
    forged.from_holder = p("mallory");
    assert!(matches!(
        fx.service.transfer(forged).await,
        Err(ChainError::NotHolder { .. })
    ));

    assert!(matches!(
        fx.service.transfer(transfer(&seeded, "h0")).await,
        Err(ChainError::SelfTransfer { .. })
    ));
}

#[tokio::test]
async fn test_unknown_token_and_chain() {
    let fx = create_test_service(&["h0", "h1"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    let mut forged = transfer(&seeded, "h1");
    forged.consumed_token_id = TokenId::generate();
    assert!(matches!(
        fx.service.transfer(forged).await,
        Err(ChainError::UnknownToken { .. })
    ));

    let mut missing = transfer(&seeded, "h1");
    missing.chain_id = ChainId::generate();
    assert!(matches!(
        fx.service.transfer(missing).await,
        Err(ChainError::ChainNotFound(_))
    ));
}

#[tokio::test]
async fn test_receiver_already_marked() {
    let fx = create_test_service(&["h0", "h1"]).await;
    let first = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;
    let second = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    // h1 was marked as the seed holder of the second chain
    assert_eq!(second.chain.current_holder_id, p("h1"));
    let result = fx.service.transfer(transfer(&first, "h1")).await;
    assert!(matches!(result, Err(ChainError::AlreadyMarked { .. })));

    // Token stays usable for somebody else
    let chain = fx.service.get_chain(first.chain.id).await.unwrap();
    assert_eq!(chain.current_token_id, Some(first.token.id));
}

#[tokio::test]
async fn test_unenrolled_scanner_is_enrolled_and_marked() {
    let fx = create_test_service(&["h0"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    fx.service.transfer(transfer(&seeded, "walk-in")).await.unwrap();

    let record = fx
        .service
        .get_attendance(&fx.session, &p("walk-in"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.entry_status, EntryStatus::Present);
}

#[tokio::test]
async fn test_hop_limit_closes_chain() {
    let fx = create_test_service(&["h0", "h1", "h2", "h3"]).await;
    let seeded = seed_one(&fx, ChainKind::Exit, ClosingRule::MaxHops(2)).await;

    let first = fx.service.transfer(transfer(&seeded, "h1")).await.unwrap();
    let next = SeededChain {
        chain: first.chain.clone(),
        token: first.next_token.clone().unwrap(),
    };
    fx.notifier.clear();

    let last = fx.service.transfer(transfer(&next, "h2")).await.unwrap();
    assert_eq!(last.result, ScanResult::ChainCompleted);
    assert!(last.chain.is_closed());
    assert_eq!(last.chain.rotation_count, 2);
    assert_eq!(last.chain.close_reason, Some(CloseReason::HopLimitReached));
    assert!(last.next_token.is_none());
    assert!(last.receiver_record.unwrap().exit_verified);

    assert!(matches!(
        &fx.notifier.events()[0],
        PresenceEvent::ChainClosed { rotation_count: 2, .. }
    ));

    // Nothing moves once closed
    let after = SeededChain {
        chain: last.chain.clone(),
        token: next.token.clone(),
    };
    let mut late = transfer(&after, "h3");
    late.from_holder = p("h2");
    assert!(matches!(
        fx.service.transfer(late).await,
        Err(ChainError::ChainClosed(_))
    ));
}

#[tokio::test]
async fn test_closing_participant_hop() {
    let fx = create_test_service(&["h0", "desk"]).await;
    let seeded = seed_one(&fx, ChainKind::Exit, ClosingRule::ClosingParticipant(p("desk"))).await;

    let receipt = fx.service.transfer(transfer(&seeded, "desk")).await.unwrap();
    assert_eq!(receipt.result, ScanResult::ChainCompleted);
    assert_eq!(receipt.chain.current_holder_id, p("desk"));
    assert_eq!(
        receipt.chain.close_reason,
        Some(CloseReason::ClosingParticipantReached)
    );
}

#[tokio::test]
async fn test_snapshot_hop_leaves_attendance_alone() {
    let fx = create_test_service(&["h0", "h1"]).await;
    let seeded = fx
        .service
        .seed(
            SeedRequest::new(fx.session.clone(), ChainKind::Snapshot, 1)
                .for_snapshot(SnapshotId::generate()),
        )
        .await
        .unwrap()
        .remove(0);

    let receipt = fx.service.transfer(transfer(&seeded, "h1")).await.unwrap();
    assert!(receipt.receiver_record.is_none());
    assert_eq!(receipt.log_entry.snapshot_id, seeded.chain.snapshot_id());

    let h1 = fx.store.get_attendance(&fx.session, &p("h1")).unwrap().unwrap();
    assert_eq!(h1.value.entry_status, EntryStatus::Absent);
}

#[tokio::test]
async fn test_notify_failure_does_not_fail_transfer() {
    let fx = create_test_service(&["h0", "h1"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;
    fx.notifier.set_failing(true);

    let receipt = fx.service.transfer(transfer(&seeded, "h1")).await.unwrap();
    assert_eq!(receipt.chain.rotation_count, 1);
    let stored = fx.service.get_chain(seeded.chain.id).await.unwrap();
    assert_eq!(stored.current_holder_id, p("h1"));
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test]
async fn test_single_conflict_is_retried() {
    let fx = create_test_service(&["h0", "h1"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;
    let writes_before = fx.kv.batch_writes();

    fx.kv.force_conflicts(1);
    let receipt = fx.service.transfer(transfer(&seeded, "h1")).await.unwrap();

    assert_eq!(receipt.chain.rotation_count, 1);
    assert_eq!(fx.kv.batch_writes() - writes_before, 2);
}

#[tokio::test]
async fn test_persistent_conflict_surfaces() {
    let fx = create_test_service(&["h0", "h1"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    fx.kv.force_conflicts(2);
    let result = fx.service.transfer(transfer(&seeded, "h1")).await;

    assert!(matches!(result, Err(ChainError::StoreConflict { .. })));
    let chain = fx.service.get_chain(seeded.chain.id).await.unwrap();
    assert_eq!(chain.rotation_count, 0);
}

#[tokio::test]
async fn test_losing_race_reports_stale() {
    let fx = create_test_service(&["h0", "h1", "rival"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;
    let now = fx.clock.now();

    // A rival scan of the same code commits between our reads and our write
    let rival_store = ChainRecordStore::new(fx.kv.inner().clone());
    let chain_id = seeded.chain.id;
    let session = fx.session.clone();
    fx.kv.before_next_write(move |_| {
        let chain = rival_store.get_chain(&chain_id).unwrap().unwrap();
        let token_id = chain.value.current_token_id.unwrap();
        let token = rival_store.get_token(&session, &token_id).unwrap().unwrap();
        let plan = plan_hop(&chain.value, &token.value, &ParticipantId::from("rival"), now, 10_000);
        let mut batch = WriteBatch::new()
            .update_chain(plan.chain, chain.version)
            .update_token(plan.consumed, token.version);
        if let Some(successor) = plan.successor {
            batch = batch.create_token(successor);
        }
        rival_store.commit(batch).unwrap();
    });

    let result = fx.service.transfer(transfer(&seeded, "h1")).await;
    assert!(matches!(result, Err(ChainError::StaleToken { .. })));

    let chain = fx.service.get_chain(seeded.chain.id).await.unwrap();
    assert_eq!(chain.rotation_count, 1);
    assert_eq!(chain.current_holder_id, p("rival"));
}

// =============================================================================
// CLOSE
// =============================================================================

#[tokio::test]
async fn test_close_revokes_outstanding_token() {
    let fx = create_test_service(&["h0", "h1"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    let closed = fx
        .service
        .close(seeded.chain.id, CloseReason::ForceEnded)
        .await
        .unwrap();
    assert!(closed.is_closed());
    assert_eq!(closed.current_token_id, None);

    let token = fx.store.get_token(&fx.session, &seeded.token.id).unwrap().unwrap();
    assert_eq!(token.value.status, TokenStatus::Revoked);

    assert!(matches!(
        fx.service.transfer(transfer(&seeded, "h1")).await,
        Err(ChainError::ChainClosed(_))
    ));
    assert!(matches!(
        fx.service.close(seeded.chain.id, CloseReason::ForceEnded).await,
        Err(ChainError::ChainClosed(_))
    ));
}

#[tokio::test]
async fn test_close_session_chains() {
    let fx = create_test_service(&["a", "b", "c"]).await;
    let seeded = fx
        .service
        .seed(SeedRequest::new(fx.session.clone(), ChainKind::Exit, 3))
        .await
        .unwrap();
    fx.service
        .close(seeded[0].chain.id, CloseReason::ForceEnded)
        .await
        .unwrap();

    let closed = fx
        .service
        .close_session_chains(&fx.session, CloseReason::SessionEnded)
        .await
        .unwrap();

    assert_eq!(closed.len(), 2);
    let chains = fx.service.list_chains(&fx.session).await.unwrap();
    assert!(chains.iter().all(|c| c.is_closed()));
}

// =============================================================================
// LIVENESS CHALLENGE
// =============================================================================

#[tokio::test]
async fn test_challenge_gates_transfer() {
    let fx = create_test_service(&["h0", "h1", "h2"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    let issued = fx
        .service
        .issue_challenge(seeded.chain.id, &p("h0"), &p("h1"))
        .await
        .unwrap();
    assert_eq!(issued.code.len(), 6);
    assert_eq!(issued.expires_at, T0 + 3 + 30_000);

    // No code
    assert!(matches!(
        fx.service.transfer(transfer(&seeded, "h1")).await,
        Err(ChainError::ChallengeFailed { .. })
    ));

    // Right code, wrong scanner
    let mut other = transfer(&seeded, "h2");
    other.challenge_code = Some(issued.code.clone());
    assert!(matches!(
        fx.service.transfer(other).await,
        Err(ChainError::ChallengeFailed { .. })
    ));

    // Failed attempts did not consume the token
    let mut answered = transfer(&seeded, "h1");
    answered.challenge_code = Some(issued.code);
    let receipt = fx.service.transfer(answered).await.unwrap();
    assert_eq!(receipt.chain.rotation_count, 1);
    assert!(receipt.next_token.unwrap().challenge.is_none());
}

#[tokio::test]
async fn test_challenge_issue_checks() {
    let fx = create_test_service(&["h0", "h1"]).await;
    let seeded = seed_one(&fx, ChainKind::Entry, ClosingRule::Manual).await;

    assert!(matches!(
        fx.service.issue_challenge(seeded.chain.id, &p("h1"), &p("h0")).await,
        Err(ChainError::NotHolder { .. })
    ));
    assert!(matches!(
        fx.service.issue_challenge(seeded.chain.id, &p("h0"), &p("h0")).await,
        Err(ChainError::SelfTransfer { .. })
    ));

    fx.clock.advance_secs(11);
    assert!(matches!(
        fx.service.issue_challenge(seeded.chain.id, &p("h0"), &p("h1")).await,
        Err(ChainError::Expired { .. })
    ));
}
