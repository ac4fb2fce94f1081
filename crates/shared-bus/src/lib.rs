//! # Shared Bus - Notify Sink for Chain State Changes
//!
//! Every successful transfer, close, attendance mark, seed and snapshot is
//! published here so real-time observers (teacher dashboards, the holder's
//! device) can react without polling.
//!
//! ## Delivery Rules
//!
//! - **Fire-and-forget:** publishing never fails the operation that triggered it.
//!   A publish with no subscribers is dropped and logged.
//! - **Lossy for slow readers:** a subscriber that lags behind the channel
//!   capacity skips ahead and counts what it missed; observers fall back to
//!   polling `list_chains`.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Holder Chain │                    │  Dashboard   │
//! │  / Scanner   │    publish()       │   observer   │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{ChainNotification, EventFilter, EventTopic, PresenceEvent};
pub use publisher::{BusStats, EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
