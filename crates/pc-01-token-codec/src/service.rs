//! Token Codec Service

use crate::domain::{BroadcastClaim, BroadcastPayload, IssuedCode};
use crate::error::{CodecError, CodecResult};
use crate::ports::inbound::BroadcastCodecApi;
use shared_crypto::{blake3_derive_key, open, seal, SecretKey};
use shared_types::{
    secs_to_millis, ChainKind, KindTtl, SessionId, TimeSource, DEFAULT_BROADCAST_TTL_SECS,
};
use std::sync::Arc;
use tracing::debug;

/// BLAKE3 derive-key context for the broadcast sealing key.
pub const CODEC_KEY_CONTEXT: &str = "presence-chain 2026 broadcast code sealing key";

/// Codec configuration
#[derive(Clone, Debug)]
pub struct CodecConfig {
    /// Broadcast-code lifetime per kind (seconds)
    pub broadcast_ttl: KindTtl,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            broadcast_ttl: KindTtl::uniform(DEFAULT_BROADCAST_TTL_SECS),
        }
    }
}

/// Stateless broadcast code issuer/verifier.
pub struct TokenCodec<T: TimeSource> {
    config: CodecConfig,
    key: SecretKey,
    time_source: Arc<T>,
}

impl<T: TimeSource> TokenCodec<T> {
    /// Create a codec keyed from the process-wide secret.
    pub fn new(config: CodecConfig, secret: &SecretKey, time_source: Arc<T>) -> Self {
        let key = SecretKey::from_bytes(blake3_derive_key(CODEC_KEY_CONTEXT, secret.as_bytes()));
        Self {
            config,
            key,
            time_source,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn encode(&self, payload: &BroadcastPayload) -> CodecResult<String> {
        let plaintext =
            bincode::serialize(payload).map_err(|e| CodecError::Serialization(e.to_string()))?;
        let sealed = seal(&self.key, &plaintext)?;
        Ok(hex::encode(sealed))
    }

    fn decode(&self, code: &str) -> CodecResult<BroadcastPayload> {
        let sealed = hex::decode(code.trim()).map_err(|e| CodecError::invalid(e.to_string()))?;
        // Any AEAD failure is indistinguishable to the caller
        let plaintext = open(&self.key, &sealed).map_err(|e| CodecError::invalid(e.to_string()))?;
        let payload: BroadcastPayload =
            bincode::deserialize(&plaintext).map_err(|e| CodecError::invalid(e.to_string()))?;

        if payload.expires_at <= payload.issued_at {
            return Err(CodecError::invalid("deadline precedes issue time"));
        }
        Ok(payload)
    }
}

impl<T: TimeSource> BroadcastCodecApi for TokenCodec<T> {
    fn issue(&self, claim: BroadcastClaim, ttl_secs: u64) -> CodecResult<String> {
        if ttl_secs == 0 {
            return Err(CodecError::ZeroTtl);
        }
        let issued_at = self.time_source.now();
        let payload = BroadcastPayload {
            session_id: claim.session_id,
            kind: claim.kind,
            issued_at,
            expires_at: issued_at.saturating_add(secs_to_millis(ttl_secs)),
        };
        self.encode(&payload)
    }

    fn verify(&self, code: &str) -> CodecResult<BroadcastPayload> {
        let payload = self.decode(code)?;
        let now = self.time_source.now();
        if payload.is_expired(now) {
            debug!(
                session_id = %payload.session_id,
                kind = %payload.kind,
                expires_at = payload.expires_at,
                now,
                "Broadcast code expired"
            );
            return Err(CodecError::Expired {
                session_id: payload.session_id,
                kind: payload.kind,
                expires_at: payload.expires_at,
                now,
            });
        }
        Ok(payload)
    }

    fn issue_for_kind(&self, session_id: SessionId, kind: ChainKind) -> CodecResult<IssuedCode> {
        let ttl_secs = self.config.broadcast_ttl.secs(kind);
        let code = self.issue(BroadcastClaim::new(session_id, kind), ttl_secs)?;
        // The clock may have moved between issue and here; report what was sealed
        let payload = self.decode(&code)?;
        Ok(IssuedCode {
            code,
            kind,
            issued_at: payload.issued_at,
            expires_at: payload.expires_at,
        })
    }
}
