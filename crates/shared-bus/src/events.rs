//! # Presence Events
//!
//! Everything the protocol announces to observers.

use serde::{Deserialize, Serialize};
use shared_types::entities::{ChainKind, CloseReason, EntryMethod};
use shared_types::ids::{ChainId, ParticipantId, SessionId, SnapshotId};

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceEvent {
    /// A chain token moved to a new holder.
    HolderChanged {
        session_id: SessionId,
        chain_id: ChainId,
        new_holder_id: ParticipantId,
        rotation_count: u64,
    },

    /// A chain reached its terminal phase.
    ChainClosed {
        session_id: SessionId,
        chain_id: ChainId,
        final_holder_id: ParticipantId,
        rotation_count: u64,
        reason: CloseReason,
    },

    /// A student's entry or exit was finalized.
    AttendanceMarked {
        session_id: SessionId,
        student_id: ParticipantId,
        kind: ChainKind,
        method: EntryMethod,
    },

    /// New chains were bootstrapped.
    ChainsSeeded {
        session_id: SessionId,
        kind: ChainKind,
        chain_ids: Vec<ChainId>,
    },

    /// A spot-check snapshot was captured.
    SnapshotTaken {
        session_id: SessionId,
        snapshot_id: SnapshotId,
        chains_created: u32,
    },
}

/// Outbound notification shape for chain state changes:
/// `{chainId, newHolderId, rotationCount, eventType}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainNotification {
    pub chain_id: ChainId,
    pub new_holder_id: ParticipantId,
    pub rotation_count: u64,
    pub event_type: String,
}

impl PresenceEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::HolderChanged { .. } | Self::ChainClosed { .. } | Self::ChainsSeeded { .. } => {
                EventTopic::Chain
            }
            Self::AttendanceMarked { .. } => EventTopic::Attendance,
            Self::SnapshotTaken { .. } => EventTopic::Snapshot,
        }
    }

    /// Session the event belongs to.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::HolderChanged { session_id, .. }
            | Self::ChainClosed { session_id, .. }
            | Self::AttendanceMarked { session_id, .. }
            | Self::ChainsSeeded { session_id, .. }
            | Self::SnapshotTaken { session_id, .. } => session_id,
        }
    }

    /// Stable event-type label.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::HolderChanged { .. } => "HOLDER_CHANGED",
            Self::ChainClosed { .. } => "CHAIN_CLOSED",
            Self::AttendanceMarked { .. } => "ATTENDANCE_MARKED",
            Self::ChainsSeeded { .. } => "CHAINS_SEEDED",
            Self::SnapshotTaken { .. } => "SNAPSHOT_TAKEN",
        }
    }

    /// Chain notification view, for transfer and close events.
    #[must_use]
    pub fn notification(&self) -> Option<ChainNotification> {
        match self {
            Self::HolderChanged {
                chain_id,
                new_holder_id,
                rotation_count,
                ..
            } => Some(ChainNotification {
                chain_id: *chain_id,
                new_holder_id: new_holder_id.clone(),
                rotation_count: *rotation_count,
                event_type: self.event_type().to_string(),
            }),
            Self::ChainClosed {
                chain_id,
                final_holder_id,
                rotation_count,
                ..
            } => Some(ChainNotification {
                chain_id: *chain_id,
                new_holder_id: final_holder_id.clone(),
                rotation_count: *rotation_count,
                event_type: self.event_type().to_string(),
            }),
            _ => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Holder changes, closes and seeds.
    Chain,
    /// Attendance marks.
    Attendance,
    /// Snapshot captures.
    Snapshot,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Sessions to include. Empty means all sessions.
    pub sessions: Vec<SessionId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            sessions: Vec::new(),
        }
    }

    /// Create a filter for a single session's events.
    #[must_use]
    pub fn session(session_id: SessionId) -> Self {
        Self {
            topics: Vec::new(),
            sessions: vec![session_id],
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &PresenceEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let session_match =
            self.sessions.is_empty() || self.sessions.contains(event.session_id());

        topic_match && session_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder_changed(session: &str) -> PresenceEvent {
        PresenceEvent::HolderChanged {
            session_id: SessionId::from(session),
            chain_id: ChainId::generate(),
            new_holder_id: ParticipantId::from("bob"),
            rotation_count: 3,
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(holder_changed("s1").topic(), EventTopic::Chain);

        let marked = PresenceEvent::AttendanceMarked {
            session_id: SessionId::from("s1"),
            student_id: ParticipantId::from("bob"),
            kind: ChainKind::Entry,
            method: EntryMethod::Chain,
        };
        assert_eq!(marked.topic(), EventTopic::Attendance);
        assert!(marked.notification().is_none());
    }

    #[test]
    fn test_notification_shape() {
        let event = holder_changed("s1");
        let note = event.notification().unwrap();
        assert_eq!(note.rotation_count, 3);
        assert_eq!(note.event_type, "HOLDER_CHANGED");

        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("newHolderId").is_some());
        assert!(json.get("rotationCount").is_some());
    }

    #[test]
    fn test_filter_all() {
        assert!(EventFilter::all().matches(&holder_changed("s1")));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Snapshot]);
        assert!(!filter.matches(&holder_changed("s1")));

        let filter = EventFilter::topics(vec![EventTopic::All]);
        assert!(filter.matches(&holder_changed("s1")));
    }

    #[test]
    fn test_filter_by_session() {
        let filter = EventFilter::session(SessionId::from("s1"));
        assert!(filter.matches(&holder_changed("s1")));
        assert!(!filter.matches(&holder_changed("s2")));
    }
}
