//! # Service Container
//!
//! Configuration plus the wired component services.

pub mod config;
pub mod services;

pub use config::{
    ChainConfig, ChallengeConfig, ConfigError, RuntimeConfig, SecurityConfig, TokenTtlConfig,
};
pub use services::{
    ConcreteCodec, ConcreteHolderChain, ConcreteNotifier, ConcreteRefresher, ConcreteScanProcessor,
    ConcreteSnapshotTrace, ConcreteStore, ServiceContainer,
};
