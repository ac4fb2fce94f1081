//! # Test Harness
//!
//! The production wiring from `presence-runtime`, driven by a manual clock.

use std::sync::Arc;

use pc_02_record_store::RecordStoreApi;
use pc_03_holder_chain::{HolderChainApi, SeedRequest, SeededChain};
use pc_04_scan_processor::{PresentedToken, ScanContext, ScanOutcome, ScanProcessorApi};
use presence_runtime::container::{RuntimeConfig, ServiceContainer};
use shared_crypto::SecretKey;
use shared_types::{
    AttendanceRecord, Chain, ChainId, ChainKind, ChainTokenWire, ClosingRule, IdentityClaim,
    ManualTimeSource, ParticipantId, RoleClaimAuthorizer, ScanLogEntry, SessionId, TimeSource,
    Token, TokenId,
};

/// 2023-11-14T22:13:20Z
pub const T0: u64 = 1_700_000_000_000;

/// A wired system, its clock, and one session.
pub struct TestSystem {
    pub services: Arc<ServiceContainer<ManualTimeSource>>,
    pub clock: Arc<ManualTimeSource>,
    pub session: SessionId,
}

/// Wire a system with `config` and enrol `students` one millisecond apart,
/// so roster order is the slice order.
pub async fn create_test_system_with(config: RuntimeConfig, students: &[&str]) -> TestSystem {
    let clock = Arc::new(ManualTimeSource::new(T0));
    let services = Arc::new(ServiceContainer::with_parts(
        config,
        Arc::clone(&clock),
        Arc::new(RoleClaimAuthorizer::default()),
    ));
    let system = TestSystem {
        services,
        clock,
        session: SessionId::from("cs101-2026-10-18"),
    };
    for name in students {
        system
            .services
            .holder_chain
            .join_session(&system.session, &ParticipantId::from(*name))
            .await
            .expect("join");
        system.clock.advance(1);
    }
    system
}

pub async fn create_test_system(students: &[&str]) -> TestSystem {
    let mut config = RuntimeConfig::default();
    config.security.codec_secret = SecretKey::generate();
    create_test_system_with(config, students).await
}

pub fn student(name: &str) -> IdentityClaim {
    IdentityClaim::new(name, "student")
}

pub fn teacher() -> IdentityClaim {
    IdentityClaim::new("prof", "teacher")
}

impl TestSystem {
    pub async fn seed(&self, kind: ChainKind, count: u32, rule: ClosingRule) -> Vec<SeededChain> {
        self.services
            .holder_chain
            .seed(SeedRequest::new(self.session.clone(), kind, count).with_closing_rule(rule))
            .await
            .expect("seed")
    }

    /// `scanner` scans the chain token shown on another device.
    pub async fn scan(&self, scanner: &str, token: &ChainTokenWire) -> ScanOutcome {
        self.services
            .scan_processor
            .process_scan(
                &student(scanner),
                PresentedToken::Chain(token.clone()),
                ScanContext::in_session(self.session.clone()),
            )
            .await
            .expect("scan")
    }

    /// Scan and return the token the scanner now holds.
    pub async fn hop(&self, scanner: &str, token: &ChainTokenWire) -> ChainTokenWire {
        let outcome = self.scan(scanner, token).await;
        outcome
            .next_token
            .unwrap_or_else(|| panic!("{scanner} did not receive a token: {:?}", outcome.result))
    }

    /// Seed one chain and return its sequence-0 token.
    pub async fn seed_one(&self, kind: ChainKind, rule: ClosingRule) -> ChainTokenWire {
        let seeded = self.seed(kind, 1, rule).await;
        seeded[0].token.to_wire()
    }

    pub fn chain(&self, chain_id: ChainId) -> Chain {
        self.services
            .store
            .get_chain(&chain_id)
            .expect("store")
            .expect("chain exists")
            .value
    }

    pub fn token(&self, token_id: TokenId) -> Token {
        self.services
            .store
            .get_token(&self.session, &token_id)
            .expect("store")
            .expect("token exists")
            .value
    }

    pub fn attendance(&self, student: &str) -> AttendanceRecord {
        self.services
            .store
            .get_attendance(&self.session, &ParticipantId::from(student))
            .expect("store")
            .expect("enrolled")
            .value
    }

    pub fn scan_log(&self) -> Vec<ScanLogEntry> {
        self.services.store.scan_log(&self.session).expect("store")
    }

    /// Every token of a chain that is live and unexpired right now.
    pub fn valid_tokens(&self, chain_id: ChainId, issued: &[TokenId]) -> Vec<TokenId> {
        let now = self.clock.now();
        issued
            .iter()
            .copied()
            .filter(|id| {
                let token = self.token(*id);
                token.chain_id == chain_id && token.is_valid_at(now)
            })
            .collect()
    }
}
