//! # Presence-Chain Test Suite
//!
//! Cross-component scenarios run against the fully wired service container.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs      # Wired system on a manual clock
//!     ├── scenarios.rs    # Scenarios A-E
//!     ├── concurrency.rs  # Racing scans and refreshes
//!     └── properties.rs   # Chain, token and snapshot invariants
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pc-tests
//! cargo test -p pc-tests integration::concurrency::
//! ```

pub mod integration;
