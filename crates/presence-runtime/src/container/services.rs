//! # Service Wiring
//!
//! Builds every component on top of one record store and one event bus.
//!
//! ```text
//! InMemoryKVStore ──► ChainRecordStore ◄──────────────┬──────────┬───────────┐
//!                           ▲                          │          │           │
//!                           │                          │          │           │
//!                  HolderChainService ◄── ScanProcessor     TokenRefresher  SnapshotTrace
//!                           │                   │                              │
//!                           ▼                   ▼                              ▼
//!                 MeteredNotifySink ──► EventBusNotifySink ──► InMemoryEventBus
//! ```
//!
//! ## Thread Safety
//!
//! - All services wrapped in `Arc` and shared across request tasks
//! - No service holds a lock across an await; races resolve in the store

use std::sync::Arc;

use tracing::{info, instrument};

use pc_01_token_codec::TokenCodec;
use pc_02_record_store::{ChainRecordStore, InMemoryKVStore};
use pc_03_holder_chain::{EventBusNotifySink, HolderChainService};
use pc_04_scan_processor::ScanProcessorService;
use pc_05_token_refresh::TokenRefreshService;
use pc_06_snapshot_trace::SnapshotTraceService;
use shared_bus::InMemoryEventBus;
use shared_types::{Authorizer, RoleClaimAuthorizer, SystemTimeSource, TimeSource};

use crate::adapters::MeteredNotifySink;
use crate::container::config::RuntimeConfig;

/// Record store over the in-memory backend.
pub type ConcreteStore = ChainRecordStore<InMemoryKVStore>;

/// Bus-backed notifier with failure metering.
pub type ConcreteNotifier = MeteredNotifySink<EventBusNotifySink<InMemoryEventBus>>;

pub type ConcreteCodec<T> = TokenCodec<T>;

pub type ConcreteHolderChain<T> = HolderChainService<ConcreteStore, ConcreteNotifier, T>;

pub type ConcreteScanProcessor<T> = ScanProcessorService<
    ConcreteStore,
    ConcreteHolderChain<T>,
    ConcreteCodec<T>,
    ConcreteNotifier,
    T,
>;

pub type ConcreteRefresher<T> = TokenRefreshService<ConcreteStore, T>;

pub type ConcreteSnapshotTrace<T> =
    SnapshotTraceService<ConcreteStore, ConcreteHolderChain<T>, ConcreteNotifier, T>;

/// Every component service, wired and ready.
pub struct ServiceContainer<T: TimeSource + 'static = SystemTimeSource> {
    // =========================================================================
    // SHARED INFRASTRUCTURE
    // =========================================================================
    /// Typed record store; every component reads and writes through it.
    pub store: Arc<ConcreteStore>,

    /// Observers subscribe here for real-time notifications.
    pub event_bus: Arc<InMemoryEventBus>,

    pub notifier: Arc<ConcreteNotifier>,

    /// Maps identity claims to capabilities.
    pub authorizer: Arc<dyn Authorizer>,

    pub time_source: Arc<T>,

    // =========================================================================
    // COMPONENTS
    // =========================================================================
    pub codec: Arc<ConcreteCodec<T>>,
    pub holder_chain: Arc<ConcreteHolderChain<T>>,
    pub scan_processor: Arc<ConcreteScanProcessor<T>>,
    pub token_refresher: Arc<ConcreteRefresher<T>>,
    pub snapshot_trace: Arc<ConcreteSnapshotTrace<T>>,

    /// Runtime configuration (immutable after initialization).
    pub config: RuntimeConfig,
}

impl ServiceContainer<SystemTimeSource> {
    /// Wire everything against the wall clock and the default role table.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(SystemTimeSource),
            Arc::new(RoleClaimAuthorizer::default()),
        )
    }
}

impl<T: TimeSource + 'static> ServiceContainer<T> {
    /// Wire everything against an injected clock and authorizer.
    #[instrument(name = "container_init", skip_all)]
    pub fn with_parts(
        config: RuntimeConfig,
        time_source: Arc<T>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        info!("Initializing Presence-Chain service container");

        // =====================================================================
        // PHASE 1: Shared Infrastructure
        // =====================================================================
        let store = Arc::new(ChainRecordStore::new(Arc::new(InMemoryKVStore::new())));
        let event_bus = Arc::new(InMemoryEventBus::new());
        let notifier = Arc::new(MeteredNotifySink::new(Arc::new(EventBusNotifySink::new(
            Arc::clone(&event_bus),
        ))));

        // =====================================================================
        // PHASE 2: Stateless Codec
        // =====================================================================
        let secret = &config.security.codec_secret;
        let codec = Arc::new(TokenCodec::new(
            config.codec_config(),
            secret,
            Arc::clone(&time_source),
        ));

        // =====================================================================
        // PHASE 3: Holder State Machine
        // =====================================================================
        let holder_chain = Arc::new(HolderChainService::new(
            config.holder_chain_config(),
            secret,
            Arc::clone(&store),
            Arc::clone(&notifier),
            Arc::clone(&time_source),
        ));

        // =====================================================================
        // PHASE 4: Components built on the state machine
        // =====================================================================
        let scan_processor = Arc::new(ScanProcessorService::new(
            Arc::clone(&store),
            Arc::clone(&holder_chain),
            Arc::clone(&codec),
            Arc::clone(&notifier),
            Arc::clone(&authorizer),
            Arc::clone(&time_source),
        ));
        let token_refresher = Arc::new(TokenRefreshService::new(
            config.refresh_config(),
            Arc::clone(&store),
            Arc::clone(&time_source),
        ));
        let snapshot_trace = Arc::new(SnapshotTraceService::new(
            Arc::clone(&store),
            Arc::clone(&holder_chain),
            Arc::clone(&notifier),
            Arc::clone(&time_source),
        ));

        info!(
            max_chains_per_seed = config.chains.max_chains_per_seed,
            challenge_ttl_secs = config.challenge.ttl_secs,
            "Service container ready"
        );

        Self {
            store,
            event_bus,
            notifier,
            authorizer,
            time_source,
            codec,
            holder_chain,
            scan_processor,
            token_refresher,
            snapshot_trace,
            config,
        }
    }
}
