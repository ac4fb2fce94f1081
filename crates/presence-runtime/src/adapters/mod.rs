//! # Runtime Adapters
//!
//! Port implementations that only make sense once the components are wired
//! into one process.

pub mod metered_notify;

pub use metered_notify::MeteredNotifySink;
