//! Driven ports (SPI - Outbound)
//!
//! Records go through `pc_02_record_store::RecordStoreApi`; the clock through
//! `shared_types::TimeSource`. The only port owned here is the notify sink.

use crate::error::NotifyError;
use async_trait::async_trait;
use shared_bus::PresenceEvent;

/// Best-effort push of state changes to real-time observers.
///
/// Callers log failures and carry on; a failed notify never rolls back the
/// change it announces.
#[async_trait]
pub trait NotifySink: Send + Sync {
    async fn notify(&self, event: PresenceEvent) -> Result<(), NotifyError>;
}
