//! # Event Publisher
//!
//! The in-process bus the chain services announce state changes on.

use crate::events::{EventFilter, PresenceEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::SessionId;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Publishing side of the bus.
///
/// Publishing never fails from the caller's point of view: an event nobody
/// is listening for is counted and dropped.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Returns how many subscribers it reached.
    async fn publish(&self, event: PresenceEvent) -> usize;

    /// Events published since the bus was created, delivered or not.
    fn events_published(&self) -> u64;
}

/// Delivery counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStats {
    pub published: u64,
    /// Published while no subscriber was attached.
    pub undelivered: u64,
    /// Sessions still open. Entries go away with `forget_session`.
    pub per_session: HashMap<SessionId, u64>,
}

/// Single-process bus over `tokio::sync::broadcast`.
///
/// Each subscriber gets its own cursor into a shared ring of `capacity`
/// events; filtering happens on the receiving side.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<PresenceEvent>,
    stats: Mutex<BusStats>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            stats: Mutex::new(BusStats::default()),
            capacity,
        }
    }

    /// Attach an observer. Only events published after this call are seen.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, sessions = filter.sessions.len(), "Observer attached");
        Subscription::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the delivery counters.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        self.stats.lock().clone()
    }

    /// Events published for one session.
    #[must_use]
    pub fn published_for(&self, session_id: &SessionId) -> u64 {
        self.stats
            .lock()
            .per_session
            .get(session_id)
            .copied()
            .unwrap_or(0)
    }

    /// Drop the per-session counter once a session has ended.
    ///
    /// The global counters keep the session's events.
    pub fn forget_session(&self, session_id: &SessionId) {
        if let Some(count) = self.stats.lock().per_session.remove(session_id) {
            debug!(session = %session_id, events = count, "Session counters released");
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: PresenceEvent) -> usize {
        let session_id = event.session_id().clone();
        let event_type = event.event_type();

        let delivered = self.sender.send(event).unwrap_or(0);

        let mut stats = self.stats.lock();
        stats.published += 1;
        *stats.per_session.entry(session_id.clone()).or_insert(0) += 1;
        if delivered == 0 {
            stats.undelivered += 1;
            // Normal when no dashboard is open
            trace!(session = %session_id, event_type, "Event published with no observers");
        } else {
            debug!(session = %session_id, event_type, receivers = delivered, "Event published");
        }
        delivered
    }

    fn events_published(&self) -> u64 {
        self.stats.lock().published
    }
}
