//! Cross-component integration tests.

pub mod harness;

mod concurrency;
mod properties;
mod scenarios;
