//! # Event Wiring
//!
//! Connects the event bus to the outside world.

pub mod notifications;

pub use notifications::NotificationRelay;
