//! Chain notifications as output lines.
//!
//! Every `HolderChanged`/`ChainClosed` event on the bus becomes one line
//! `{"notification":{"chainId":..,"newHolderId":..,"rotationCount":..,"eventType":..}}`.
//! Delivery is best-effort: a slow reader drops events rather than stall scans.

use serde::Serialize;
use shared_bus::{ChainNotification, EventFilter, EventTopic, InMemoryEventBus, PresenceEvent};
use shared_bus::Subscription;
use tracing::debug;

#[derive(Serialize)]
struct NotificationLine<'a> {
    notification: &'a ChainNotification,
}

/// Subscription to chain events, rendered as JSON lines.
pub struct NotificationRelay {
    subscription: Subscription,
}

impl NotificationRelay {
    pub fn new(bus: &InMemoryEventBus) -> Self {
        Self {
            subscription: bus.subscribe(EventFilter::topics(vec![EventTopic::Chain])),
        }
    }

    fn render(event: &PresenceEvent) -> Option<String> {
        let Some(notification) = event.notification() else {
            debug!(event_type = event.event_type(), "Event has no outbound notification");
            return None;
        };
        serde_json::to_string(&NotificationLine {
            notification: &notification,
        })
        .ok()
    }

    /// Wait for the next notification line. `None` once the bus is gone.
    pub async fn next_line(&mut self) -> Option<String> {
        loop {
            let event = self.subscription.recv().await?;
            if let Some(line) = Self::render(&event) {
                return Some(line);
            }
        }
    }

    /// Everything already queued, without waiting.
    pub fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(Some(event)) = self.subscription.try_recv() {
            lines.extend(Self::render(&event));
        }
        lines
    }
}
