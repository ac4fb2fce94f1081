//! # Concurrency
//!
//! Racing scanners and pollers against the shared record store on a
//! multi-threaded runtime.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use pc_05_token_refresh::TokenRefreshApi;
    use shared_types::{ChainKind, ClosingRule, ParticipantId, ScanResult};
    use std::sync::Arc;

    // =========================================================================
    // SCENARIO B: TWO SCANNERS, ONE TOKEN
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_scans_have_one_winner() {
        for _ in 0..20 {
            let system = Arc::new(create_test_system(&["alice", "bob", "carol"]).await);
            let seed = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;

            let handles: Vec<_> = ["bob", "carol"]
                .into_iter()
                .map(|scanner| {
                    let system = Arc::clone(&system);
                    let token = seed.clone();
                    tokio::spawn(async move { system.scan(scanner, &token).await })
                })
                .collect();

            let mut results = Vec::new();
            for handle in handles {
                results.push(handle.await.unwrap());
            }

            let winners: Vec<_> = results
                .iter()
                .filter(|outcome| outcome.result == ScanResult::Transferred)
                .collect();
            assert_eq!(winners.len(), 1, "results: {results:?}");
            assert!(results
                .iter()
                .any(|outcome| outcome.result == ScanResult::RejectedStale));

            let chain = system.chain(seed.chain_id);
            assert_eq!(chain.rotation_count, 1);
            assert_eq!(chain.current_holder_id, winners[0].scanner_id);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_chains_do_not_interfere() {
        let system = Arc::new(
            create_test_system(&["s1", "s2", "s3", "s4", "r1", "r2", "r3", "r4"]).await,
        );
        let seeded = system.seed(ChainKind::Entry, 4, ClosingRule::Manual).await;

        let handles: Vec<_> = seeded
            .iter()
            .zip(["r1", "r2", "r3", "r4"])
            .map(|(chain, receiver)| {
                let system = Arc::clone(&system);
                let token = chain.token.to_wire();
                tokio::spawn(async move { system.scan(receiver, &token).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().result, ScanResult::Transferred);
        }
        for chain in &seeded {
            assert_eq!(system.chain(chain.chain.id).rotation_count, 1);
        }
    }

    // =========================================================================
    // REFRESH RACES
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refreshes_converge() {
        let system = Arc::new(create_test_system(&["alice", "bob"]).await);
        let seed = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;
        system.clock.advance_secs(11);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let system = Arc::clone(&system);
                let chain_id = seed.chain_id;
                tokio::spawn(async move {
                    system
                        .services
                        .token_refresher
                        .get_or_refresh_token(chain_id, &ParticipantId::from("alice"))
                        .await
                })
            })
            .collect();

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().expect("refresh"));
        }
        assert_eq!(tokens[0].token.id, tokens[1].token.id);
        assert_eq!(tokens.iter().filter(|t| t.refreshed).count(), 1);

        let chain = system.chain(seed.chain_id);
        assert_eq!(chain.current_token_id, Some(tokens[0].token.id));
        assert_eq!(chain.rotation_count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_refresh_racing_scan_leaves_one_valid_token() {
        let system = Arc::new(create_test_system(&["alice", "bob"]).await);
        let seed = system.seed_one(ChainKind::Entry, ClosingRule::Manual).await;

        let scan = {
            let system = Arc::clone(&system);
            let token = seed.clone();
            tokio::spawn(async move { system.scan("bob", &token).await })
        };
        let poll = {
            let system = Arc::clone(&system);
            let chain_id = seed.chain_id;
            tokio::spawn(async move {
                system
                    .services
                    .token_refresher
                    .get_or_refresh_token(chain_id, &ParticipantId::from("alice"))
                    .await
            })
        };

        let outcome = scan.await.unwrap();
        let _ = poll.await.unwrap();
        assert_eq!(outcome.result, ScanResult::Transferred);

        let chain = system.chain(seed.chain_id);
        let current = chain.current_token_id.expect("open chain has a token");
        assert_eq!(system.valid_tokens(seed.chain_id, &[seed.token_id, current]), vec![current]);
    }
}
