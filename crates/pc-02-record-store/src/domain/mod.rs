//! Domain layer for the Chain Record Store

mod batch;
mod keys;

pub use batch::{RecordWrite, Version, Versioned, WriteBatch};
pub use keys::KeyPrefix;
