//! # Adapters Layer
//!
//! Notify sink implementations.

mod notify;

pub use notify::{EventBusNotifySink, NoopNotifySink, RecordingNotifySink};
