//! Notify sink adapters.

use crate::error::NotifyError;
use crate::ports::outbound::NotifySink;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, PresenceEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Publishes onto the in-process event bus.
pub struct EventBusNotifySink<P: EventPublisher> {
    bus: Arc<P>,
}

impl<P: EventPublisher> EventBusNotifySink<P> {
    pub fn new(bus: Arc<P>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl<P: EventPublisher> NotifySink for EventBusNotifySink<P> {
    async fn notify(&self, event: PresenceEvent) -> Result<(), NotifyError> {
        // Zero receivers is normal when no dashboard is open
        let receivers = self.bus.publish(event).await;
        debug!(receivers, "Presence event published");
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifySink;

#[async_trait]
impl NotifySink for NoopNotifySink {
    async fn notify(&self, _event: PresenceEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Keeps every event in memory; can be switched to fail on demand.
#[derive(Default)]
pub struct RecordingNotifySink {
    events: Mutex<Vec<PresenceEvent>>,
    failing: AtomicBool,
}

impl RecordingNotifySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent notify fail (events are still recorded).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<PresenceEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl NotifySink for RecordingNotifySink {
    async fn notify(&self, event: PresenceEvent) -> Result<(), NotifyError> {
        self.events.lock().push(event);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError {
                reason: "push transport unavailable".to_string(),
            });
        }
        Ok(())
    }
}
