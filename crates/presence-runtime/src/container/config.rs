//! # Runtime Configuration
//!
//! Unified configuration for every component service.
//!
//! ## Security Requirements
//!
//! - The codec secret MUST NOT be the default zero value in production
//! - Every lifetime has a sane default with a per-kind override

use pc_01_token_codec::CodecConfig;
use pc_03_holder_chain::{HolderChainConfig, DEFAULT_CHALLENGE_TTL_SECS, DEFAULT_MAX_CHAINS_PER_SEED};
use pc_05_token_refresh::RefreshConfig;
use presence_telemetry::parse_flag;
use shared_crypto::{CryptoError, SecretKey};
use shared_types::{ChainKind, KindTtl, DEFAULT_BROADCAST_TTL_SECS, DEFAULT_TOKEN_TTL_SECS};
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub security: SecurityConfig,
    pub ttl: TokenTtlConfig,
    pub challenge: ChallengeConfig,
    pub chains: ChainConfig,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Codec secret is not set (zero value).
    #[error(
        "SECURITY VIOLATION: codec secret is the default zero value. \
         Set PC_CODEC_SECRET (64 hex chars) or PC_DEV_MODE=1."
    )]
    InsecureCodecSecret,

    /// `PC_CODEC_SECRET` is not a 32-byte hex string.
    #[error("PC_CODEC_SECRET is invalid: {0}")]
    InvalidSecret(#[from] CryptoError),

    /// A numeric variable did not parse or was out of range.
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: String, value: String },
}

impl RuntimeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// # Environment Variables
    ///
    /// - `PC_CODEC_SECRET`: 32-byte hex codec secret
    /// - `PC_DEV_MODE`: generate a random secret when none is set
    /// - `PC_TTL_<KIND>_SECS`: chain-token lifetime for one kind
    /// - `PC_BROADCAST_TTL_<KIND>_SECS`: broadcast-code lifetime for one kind
    /// - `PC_CHALLENGE_TTL_SECS`: liveness challenge lifetime
    /// - `PC_MAX_CHAINS`: upper bound for chains per seed call
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.security.dev_mode = lookup("PC_DEV_MODE")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        match lookup("PC_CODEC_SECRET") {
            Some(secret_hex) => {
                config.security.codec_secret = SecretKey::from_hex(&secret_hex)?;
            }
            None if config.security.dev_mode => {
                config.security.codec_secret = SecretKey::generate();
            }
            None => {}
        }

        for kind in ChainKind::ALL {
            let token_key = format!("PC_TTL_{}_SECS", kind.as_str());
            if let Some(secs) = positive(&lookup, &token_key)? {
                config.ttl.token = config.ttl.token.with(kind, secs);
            }
            let broadcast_key = format!("PC_BROADCAST_TTL_{}_SECS", kind.as_str());
            if let Some(secs) = positive(&lookup, &broadcast_key)? {
                config.ttl.broadcast = config.ttl.broadcast.with(kind, secs);
            }
        }

        if let Some(secs) = positive(&lookup, "PC_CHALLENGE_TTL_SECS")? {
            config.challenge.ttl_secs = secs;
        }
        if let Some(max) = positive(&lookup, "PC_MAX_CHAINS")? {
            config.chains.max_chains_per_seed =
                u32::try_from(max).map_err(|_| ConfigError::InvalidNumber {
                    key: "PC_MAX_CHAINS".to_string(),
                    value: max.to_string(),
                })?;
        }

        Ok(config)
    }

    /// Validate configuration for production readiness.
    ///
    /// Fails if the codec secret is the default zero value.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.security.codec_secret.is_zero() {
            return Err(ConfigError::InsecureCodecSecret);
        }
        Ok(())
    }

    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig {
            broadcast_ttl: self.ttl.broadcast,
        }
    }

    pub fn holder_chain_config(&self) -> HolderChainConfig {
        HolderChainConfig {
            token_ttl: self.ttl.token,
            challenge_ttl_secs: self.challenge.ttl_secs,
            max_chains_per_seed: self.chains.max_chains_per_seed,
        }
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            token_ttl: self.ttl.token,
        }
    }
}

fn positive<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::InvalidNumber {
            key: key.to_string(),
            value: raw,
        }),
    }
}

/// Security configuration.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Process-wide secret; codec and challenge keys are derived from it.
    /// MUST NOT be default in production.
    pub codec_secret: SecretKey,
    /// Whether a missing secret may be generated at startup.
    pub dev_mode: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            codec_secret: SecretKey::from_bytes([0u8; 32]), // MUST be overridden in production
            dev_mode: false,
        }
    }
}

/// Per-kind lifetimes (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtlConfig {
    /// Chain tokens.
    pub token: KindTtl,
    /// Broadcast codes.
    pub broadcast: KindTtl,
}

impl Default for TokenTtlConfig {
    fn default() -> Self {
        Self {
            token: KindTtl::uniform(DEFAULT_TOKEN_TTL_SECS),
            broadcast: KindTtl::uniform(DEFAULT_BROADCAST_TTL_SECS),
        }
    }
}

/// Liveness challenge configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeConfig {
    pub ttl_secs: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CHALLENGE_TTL_SECS,
        }
    }
}

/// Chain seeding limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    pub max_chains_per_seed: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_chains_per_seed: DEFAULT_MAX_CHAINS_PER_SEED,
        }
    }
}
