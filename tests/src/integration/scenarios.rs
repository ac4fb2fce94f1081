//! # End-to-End Scenarios
//!
//! Classroom flows across seeding, scanning, refresh and snapshots.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use pc_03_holder_chain::HolderChainApi;
    use pc_04_scan_processor::{PresentedToken, ScanContext, ScanProcessorApi};
    use pc_05_token_refresh::TokenRefreshApi;
    use pc_06_snapshot_trace::{SnapshotRequest, SnapshotTraceApi};
    use shared_types::{
        ChainKind, ChainPhase, CloseReason, ClosingRule, EntryMethod, EntryStatus, ParticipantId,
        ScanResult,
    };

    // =========================================================================
    // SCENARIO A: SEED AND ONE HOP
    // =========================================================================

    #[tokio::test]
    async fn test_single_hop_activates_chain() {
        let system = create_test_system(&["alice", "bob", "carol"]).await;
        let seed = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;
        assert_eq!(seed.holder_id, ParticipantId::from("alice"));
        assert_eq!(seed.sequence, 0);

        let outcome = system.scan("bob", &seed).await;
        assert_eq!(outcome.result, ScanResult::Transferred);

        let chain = system.chain(seed.chain_id);
        assert_eq!(chain.phase, ChainPhase::Active);
        assert_eq!(chain.rotation_count, 1);
        assert_eq!(chain.current_holder_id, ParticipantId::from("bob"));
        assert_eq!(chain.previous_token_id, Some(seed.token_id));

        let next = outcome.next_token.expect("bob holds the chain");
        assert_eq!(next.sequence, 1);
        assert_eq!(chain.current_token_id, Some(next.token_id));

        let successes: Vec<_> = system
            .scan_log()
            .into_iter()
            .filter(|entry| entry.result.is_success())
            .collect();
        assert_eq!(successes.len(), 1);
        assert_eq!(successes[0].scanner_id, ParticipantId::from("bob"));
        assert_eq!(successes[0].from_holder_id, Some(ParticipantId::from("alice")));
        assert_eq!(successes[0].sequence, Some(0));

        let bob = system.attendance("bob");
        assert_eq!(bob.entry_status, EntryStatus::Present);
        assert_eq!(bob.entry_method, Some(EntryMethod::Chain));
    }

    #[tokio::test]
    async fn test_seed_holder_is_marked_at_seed_time() {
        let system = create_test_system(&["alice", "bob"]).await;
        system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;

        let alice = system.attendance("alice");
        assert_eq!(alice.entry_method, Some(EntryMethod::Chain));
        assert_eq!(system.attendance("bob").entry_method, None);
    }

    // =========================================================================
    // SCENARIO C: EXPIRY AND REFRESH
    // =========================================================================

    #[tokio::test]
    async fn test_expired_token_is_refreshed_in_place() {
        let system = create_test_system(&["alice", "bob"]).await;
        let seed = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;

        system.clock.advance_secs(11);
        let outcome = system.scan("bob", &seed).await;
        assert_eq!(outcome.result, ScanResult::RejectedExpired);
        assert!(outcome.should_refresh());

        let refreshed = system
            .services
            .token_refresher
            .get_or_refresh_token(seed.chain_id, &ParticipantId::from("alice"))
            .await
            .unwrap();
        assert!(refreshed.refreshed);
        assert_ne!(refreshed.token.id, seed.token_id);
        assert_eq!(refreshed.token.sequence, seed.sequence);
        assert_eq!(system.chain(seed.chain_id).rotation_count, 0);

        let outcome = system.scan("bob", &refreshed.token.to_wire()).await;
        assert_eq!(outcome.result, ScanResult::Transferred);
        assert_eq!(outcome.next_token.unwrap().sequence, 1);
    }

    // =========================================================================
    // SCENARIO D: CLOSING PARTICIPANT ON AN EXIT CHAIN
    // =========================================================================

    #[tokio::test]
    async fn test_closing_scan_marks_exit_once() {
        let system = create_test_system(&["alice", "bob", "carol"]).await;
        let rule = ClosingRule::ClosingParticipant(ParticipantId::from("carol"));
        let seed = system.seed_one(ChainKind::Exit, rule).await;

        let bob_token = system.hop("bob", &seed).await;
        let closing = system.scan("carol", &bob_token).await;
        assert_eq!(closing.result, ScanResult::ChainCompleted);
        assert!(closing.next_token.is_none());

        let chain = system.chain(seed.chain_id);
        assert!(chain.is_closed());
        assert_eq!(chain.close_reason, Some(CloseReason::ClosingParticipantReached));
        assert_eq!(chain.current_token_id, None);

        let carol = system.attendance("carol");
        assert!(carol.exit_verified);
        assert_eq!(carol.exit_method, Some(EntryMethod::Chain));
        let exited_at = carol.exited_at.expect("exit time recorded");

        system.clock.advance_secs(2);
        let repeat = system.scan("carol", &bob_token).await;
        assert_eq!(repeat.result, ScanResult::AlreadyMarked);
        assert!(repeat.is_accepted());
        assert_eq!(system.attendance("carol").exited_at, Some(exited_at));
    }

    #[tokio::test]
    async fn test_scan_on_closed_chain_is_rejected() {
        let system = create_test_system(&["alice", "bob"]).await;
        let seed = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;

        system
            .services
            .holder_chain
            .close_session_chains(&system.session, CloseReason::SessionEnded)
            .await
            .unwrap();

        let outcome = system.scan("bob", &seed).await;
        assert_eq!(outcome.result, ScanResult::ChainClosed);
        assert_eq!(system.attendance("bob").entry_method, None);
    }

    // =========================================================================
    // BROADCAST CODES
    // =========================================================================

    #[tokio::test]
    async fn test_broadcast_code_marks_late_arrival() {
        let system = create_test_system(&["alice"]).await;
        let code = system
            .services
            .scan_processor
            .issue_broadcast_code(&teacher(), system.session.clone(), ChainKind::Late)
            .await
            .unwrap();

        system.clock.advance_secs(5);
        let outcome = system
            .services
            .scan_processor
            .process_scan(
                &student("alice"),
                PresentedToken::Broadcast(code.code.clone()),
                ScanContext::in_session(system.session.clone()),
            )
            .await
            .unwrap();
        assert_eq!(outcome.result, ScanResult::MarkedDirect);

        let alice = system.attendance("alice");
        assert_eq!(alice.entry_status, EntryStatus::Late);
        assert_eq!(alice.entry_method, Some(EntryMethod::DirectQr));
    }

    // =========================================================================
    // SCENARIO E: SNAPSHOT COMPARISON
    // =========================================================================

    #[tokio::test]
    async fn test_compare_reports_added_student() {
        let system = create_test_system(&["alice", "bob", "carol"]).await;
        let snapshots = &system.services.snapshot_trace;

        let first = snapshots
            .take_snapshot(SnapshotRequest::new(system.session.clone(), 1).with_label("Start"))
            .await
            .unwrap();
        system.hop("bob", &first.chains[0].token.to_wire()).await;

        let second = snapshots
            .take_snapshot(SnapshotRequest::new(system.session.clone(), 1).with_label("End"))
            .await
            .unwrap();
        let bob_token = system.hop("bob", &second.chains[0].token.to_wire()).await;
        system.hop("carol", &bob_token).await;

        let comparison = snapshots
            .compare(first.snapshot.id, second.snapshot.id)
            .await
            .unwrap();
        assert_eq!(comparison.added, vec![ParticipantId::from("carol")]);
        assert!(comparison.removed.is_empty());
        assert_eq!(
            comparison.unchanged,
            vec![ParticipantId::from("alice"), ParticipantId::from("bob")]
        );

        // Snapshot hops never touch attendance
        assert_eq!(system.attendance("carol").entry_method, None);
    }

    #[tokio::test]
    async fn test_trace_follows_hops_in_order() {
        let system = create_test_system(&["alice", "bob", "carol"]).await;
        let snapshots = &system.services.snapshot_trace;

        let taken = snapshots
            .take_snapshot(SnapshotRequest::new(system.session.clone(), 1))
            .await
            .unwrap();
        assert_eq!(taken.snapshot.label, "Snapshot 1");

        let bob_token = system.hop("bob", &taken.chains[0].token.to_wire()).await;
        system.clock.advance(50);
        system.hop("carol", &bob_token).await;

        let trace = snapshots.get_trace(taken.snapshot.id).await.unwrap();
        assert_eq!(trace.chains.len(), 1);
        let hops = &trace.chains[0].hops;
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[0].to_holder_id, ParticipantId::from("bob"));
        assert_eq!(hops[1].to_holder_id, ParticipantId::from("carol"));
        assert!(hops[0].recorded_at < hops[1].recorded_at);
    }
}
