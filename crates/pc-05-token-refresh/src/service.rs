//! Token Refresher Service
//!
//! Nothing sweeps tokens in the background. A token is replaced only when its
//! holder's client polls after it expired, so idle chains cost nothing.

use crate::error::{RefreshError, RefreshResult};
use crate::ports::inbound::{RefreshedToken, TokenRefreshApi};
use async_trait::async_trait;
use pc_02_record_store::{RecordStoreApi, WriteBatch};
use pc_03_holder_chain::mint_token;
use shared_types::{
    ChainId, KindTtl, ParticipantId, TimeSource, TokenStatus, DEFAULT_TOKEN_TTL_SECS,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Refresher configuration
#[derive(Clone, Debug)]
pub struct RefreshConfig {
    /// Lifetime of a replacement token per kind (seconds)
    pub token_ttl: KindTtl,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            token_ttl: KindTtl::uniform(DEFAULT_TOKEN_TTL_SECS),
        }
    }
}

/// On-Demand Token Refresher implementation
pub struct TokenRefreshService<R: RecordStoreApi, T: TimeSource> {
    config: RefreshConfig,
    store: Arc<R>,
    time_source: Arc<T>,
}

impl<R: RecordStoreApi, T: TimeSource> TokenRefreshService<R, T> {
    pub fn new(config: RefreshConfig, store: Arc<R>, time_source: Arc<T>) -> Self {
        Self {
            config,
            store,
            time_source,
        }
    }

    fn try_refresh(
        &self,
        chain_id: ChainId,
        holder_id: &ParticipantId,
    ) -> RefreshResult<RefreshedToken> {
        let now = self.time_source.now();
        let chain = self
            .store
            .get_chain(&chain_id)?
            .ok_or(RefreshError::ChainNotFound(chain_id))?;
        if chain.value.is_closed() {
            return Err(RefreshError::ChainClosed(chain_id));
        }
        if &chain.value.current_holder_id != holder_id {
            return Err(RefreshError::NotHolder {
                chain_id,
                claimed: holder_id.clone(),
            });
        }

        let token = chain
            .value
            .current_token_id
            .map(|token_id| self.store.get_token(&chain.value.session_id, &token_id))
            .transpose()?
            .flatten()
            .filter(|t| t.value.status == TokenStatus::Live)
            .ok_or(RefreshError::NoLiveToken { chain_id })?;

        if !token.value.is_expired(now) {
            return Ok(RefreshedToken {
                token: token.value,
                refreshed: false,
            });
        }

        let ttl_ms = self.config.token_ttl.millis(chain.value.kind);
        let mut replacement = mint_token(&chain.value, holder_id, token.value.sequence, now, ttl_ms);
        // An unanswered challenge outlives the token it was attached to
        replacement.challenge = token
            .value
            .challenge
            .clone()
            .filter(|challenge| !challenge.is_expired(now));

        let mut superseded = token.value;
        superseded.status = TokenStatus::Superseded;

        let mut updated = chain.value;
        updated.previous_token_id = Some(superseded.id);
        updated.current_token_id = Some(replacement.id);

        self.store.commit(
            WriteBatch::new()
                .update_chain(updated, chain.version)
                .update_token(superseded, token.version)
                .create_token(replacement.clone()),
        )?;

        Ok(RefreshedToken {
            token: replacement,
            refreshed: true,
        })
    }
}

#[async_trait]
impl<R, T> TokenRefreshApi for TokenRefreshService<R, T>
where
    R: RecordStoreApi + 'static,
    T: TimeSource + 'static,
{
    async fn get_or_refresh_token(
        &self,
        chain_id: ChainId,
        holder_id: &ParticipantId,
    ) -> RefreshResult<RefreshedToken> {
        // A lost race means someone else already refreshed; the re-read returns theirs
        let result = match self.try_refresh(chain_id, holder_id) {
            Err(RefreshError::Store(e)) if e.is_conflict() => {
                debug!(chain_id = %chain_id, "Refresh conflict, re-reading");
                match self.try_refresh(chain_id, holder_id) {
                    Err(RefreshError::Store(e)) if e.is_conflict() => {
                        warn!(chain_id = %chain_id, "Refresh conflict persisted after retry");
                        Err(RefreshError::StoreConflict { chain_id })
                    }
                    other => other,
                }
            }
            other => other,
        };

        match &result {
            Ok(current) if current.refreshed => info!(
                chain_id = %chain_id,
                holder = %holder_id,
                sequence = current.token.sequence,
                expires_at = current.token.expires_at,
                "Token refreshed"
            ),
            Ok(current) => debug!(
                chain_id = %chain_id,
                holder = %holder_id,
                expires_at = current.token.expires_at,
                "Token still live"
            ),
            Err(e) => debug!(chain_id = %chain_id, holder = %holder_id, error = %e, "Refresh refused"),
        }
        result
    }
}
