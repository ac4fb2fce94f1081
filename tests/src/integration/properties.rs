//! # Chain Properties
//!
//! Invariants that must hold across any sequence of hops, polls and captures.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use pc_03_holder_chain::HolderChainApi;
    use pc_04_scan_processor::ScanProcessorApi;
    use pc_05_token_refresh::TokenRefreshApi;
    use pc_06_snapshot_trace::{SnapshotRequest, SnapshotTraceApi};
    use presence_runtime::container::RuntimeConfig;
    use shared_crypto::SecretKey;
    use shared_types::{ChainKind, ClosingRule, ParticipantId, ScanResult, TokenStatus};

    const CLASS: [&str; 6] = ["alice", "bob", "carol", "dave", "erin", "frank"];

    // =========================================================================
    // ROTATION
    // =========================================================================

    #[tokio::test]
    async fn test_rotation_counts_every_hop() {
        let system = create_test_system(&CLASS).await;
        let mut token = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;
        let mut issued = vec![token.token_id];

        for (hop, receiver) in CLASS[1..].iter().enumerate() {
            token = system.hop(receiver, &token).await;
            issued.push(token.token_id);

            let chain = system.chain(token.chain_id);
            assert_eq!(chain.rotation_count, hop as u64 + 1);
            assert_eq!(token.sequence, chain.rotation_count);
            assert_eq!(system.valid_tokens(token.chain_id, &issued), vec![token.token_id]);
        }

        for id in &issued[..issued.len() - 1] {
            assert_eq!(system.token(*id).status, TokenStatus::Consumed);
        }
    }

    #[tokio::test]
    async fn test_hop_limit_closes_after_exact_count() {
        let system = create_test_system(&CLASS).await;
        let mut token = system.seed_one(ChainKind::Entry, ClosingRule::MaxHops(3)).await;

        token = system.hop("bob", &token).await;
        token = system.hop("carol", &token).await;
        let last = system.scan("dave", &token).await;
        assert_eq!(last.result, ScanResult::ChainCompleted);

        let chain = system.chain(token.chain_id);
        assert_eq!(chain.rotation_count, 3);
        assert!(chain.is_closed());
    }

    // =========================================================================
    // REPLAY AND HOLDER CHECKS
    // =========================================================================

    #[tokio::test]
    async fn test_replayed_token_is_stale_for_everyone() {
        let system = create_test_system(&CLASS).await;
        let seed = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;
        system.hop("bob", &seed).await;

        for scanner in ["carol", "dave"] {
            assert_eq!(
                system.scan(scanner, &seed).await.result,
                ScanResult::RejectedStale
            );
        }
        assert_eq!(system.chain(seed.chain_id).rotation_count, 1);

        let rejected = system
            .scan_log()
            .into_iter()
            .filter(|entry| entry.result == ScanResult::RejectedStale)
            .count();
        assert_eq!(rejected, 2);
    }

    #[tokio::test]
    async fn test_holder_cannot_scan_own_token() {
        let system = create_test_system(&CLASS).await;
        let seed = system.seed_one(ChainKind::Snapshot, ClosingRule::Manual).await;

        let outcome = system.scan("alice", &seed).await;
        assert_eq!(outcome.result, ScanResult::SelfTransfer);
        assert_eq!(system.chain(seed.chain_id).rotation_count, 0);
    }

    #[tokio::test]
    async fn test_forged_holder_claim_is_rejected() {
        let system = create_test_system(&CLASS).await;
        let mut forged = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;
        forged.holder_id = ParticipantId::from("erin");

        let outcome = system.scan("bob", &forged).await;
        assert_eq!(outcome.result, ScanResult::NotHolder);
        assert_eq!(system.attendance("bob").entry_method, None);
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    #[tokio::test]
    async fn test_refresh_is_idempotent_while_live() {
        let system = create_test_system(&CLASS).await;
        let seed = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;
        let refresher = &system.services.token_refresher;
        let alice = ParticipantId::from("alice");

        system.clock.advance_secs(3);
        let first = refresher.get_or_refresh_token(seed.chain_id, &alice).await.unwrap();
        let second = refresher.get_or_refresh_token(seed.chain_id, &alice).await.unwrap();
        assert!(!first.refreshed);
        assert_eq!(first.token.id, seed.token_id);
        assert_eq!(first, second);

        system.clock.advance_secs(8);
        let replaced = refresher.get_or_refresh_token(seed.chain_id, &alice).await.unwrap();
        let again = refresher.get_or_refresh_token(seed.chain_id, &alice).await.unwrap();
        assert!(replaced.refreshed);
        assert!(!again.refreshed);
        assert_eq!(replaced.token.id, again.token.id);
        assert_eq!(system.token(seed.token_id).status, TokenStatus::Superseded);
        assert_eq!(
            system.valid_tokens(seed.chain_id, &[seed.token_id, replaced.token.id]),
            vec![replaced.token.id]
        );
    }

    // =========================================================================
    // SNAPSHOT ISOLATION
    // =========================================================================

    #[tokio::test]
    async fn test_snapshot_leaves_running_chains_alone() {
        let system = create_test_system(&CLASS).await;
        let entry = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;
        let bob_token = system.hop("bob", &entry).await;
        let before = system.chain(entry.chain_id);

        let taken = system
            .services
            .snapshot_trace
            .take_snapshot(SnapshotRequest::new(system.session.clone(), 2))
            .await
            .unwrap();
        assert_eq!(taken.chains.len(), 2);
        assert_eq!(system.chain(entry.chain_id), before);

        // The entry chain still hops normally
        let outcome = system.scan("carol", &bob_token).await;
        assert_eq!(outcome.result, ScanResult::Transferred);

        let chains = system
            .services
            .holder_chain
            .list_chains(&system.session)
            .await
            .unwrap();
        assert_eq!(chains.len(), 3);
        assert_eq!(
            chains.iter().filter(|c| c.snapshot_id() == Some(taken.snapshot.id)).count(),
            2
        );
    }

    // =========================================================================
    // PER-KIND LIFETIMES
    // =========================================================================

    #[tokio::test]
    async fn test_token_lifetime_follows_kind() {
        let mut config = RuntimeConfig::default();
        config.security.codec_secret = SecretKey::generate();
        config.ttl.token = config.ttl.token.with(ChainKind::Late, 25);
        config.ttl.broadcast = config.ttl.broadcast.with(ChainKind::Exit, 45);
        let system = create_test_system_with(config, &CLASS).await;

        let entry = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;
        let late = system.seed_one(ChainKind::Late, ClosingRule::Manual).await;
        assert_eq!(entry.expires_at - T0, 10_000 + CLASS.len() as u64);
        assert_eq!(late.expires_at - T0, 25_000 + CLASS.len() as u64);

        let scanner = &system.services.scan_processor;
        let exit_code = scanner
            .issue_broadcast_code(&teacher(), system.session.clone(), ChainKind::Exit)
            .await
            .unwrap();
        let entry_code = scanner
            .issue_broadcast_code(&teacher(), system.session.clone(), ChainKind::Entry)
            .await
            .unwrap();
        assert_eq!(exit_code.expires_at - exit_code.issued_at, 45_000);
        assert_eq!(entry_code.expires_at - entry_code.issued_at, 20_000);

        // 12 s in: the entry token is gone, the late one still passes
        system.clock.advance_secs(12);
        assert_eq!(
            system.scan("erin", &entry).await.result,
            ScanResult::RejectedExpired
        );
        assert_eq!(system.scan("frank", &late).await.result, ScanResult::Transferred);
    }
}
