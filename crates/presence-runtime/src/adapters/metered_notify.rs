//! Notify sink wrapper that counts delivery failures.

use async_trait::async_trait;
use pc_03_holder_chain::{NotifyError, NotifySink};
use presence_telemetry::{metric_inc, NOTIFY_FAILURES};
use shared_bus::PresenceEvent;
use std::sync::Arc;
use tracing::warn;

/// Forwards to an inner sink and records every failure in
/// `pc_notify_failures_total`. The failure is still returned; the calling
/// service decides it is not fatal.
pub struct MeteredNotifySink<N: NotifySink> {
    inner: Arc<N>,
}

impl<N: NotifySink> MeteredNotifySink<N> {
    pub fn new(inner: Arc<N>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<N> {
        &self.inner
    }
}

#[async_trait]
impl<N: NotifySink> NotifySink for MeteredNotifySink<N> {
    async fn notify(&self, event: PresenceEvent) -> Result<(), NotifyError> {
        let event_type = event.event_type();
        let result = self.inner.notify(event).await;
        if let Err(e) = &result {
            metric_inc!(NOTIFY_FAILURES);
            warn!(event_type, error = %e, "Notify sink rejected event");
        }
        result
    }
}
