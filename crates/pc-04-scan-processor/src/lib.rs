//! # Scan Processor Subsystem
//!
//! Single entry point for everything a participant's device scans.
//!
//! ## Flow
//!
//! ```text
//! process_scan(scanner, presented, context)
//!     │
//!     ├── scanner lacks Scan ──────────────────────► Err(Unauthorized)
//!     │
//!     ├── PresentedToken::Chain ──► record store lookup
//!     │        ├── unknown chain / other session ──► RejectedInvalid
//!     │        ├── scanner already finalized ──────► AlreadyMarked
//!     │        └── HolderChainApi::transfer ───────► Transferred | ChainCompleted
//!     │                                             | RejectedStale | RejectedExpired
//!     │                                             | NotHolder | ChallengeFailed ...
//!     │
//!     └── PresentedToken::Broadcast ──► codec verify
//!              ├── expired / invalid / other session ► RejectedExpired | RejectedInvalid
//!              ├── scanner already finalized ──────► AlreadyMarked
//!              └── mark DIRECT_QR ─────────────────► MarkedDirect
//! ```
//!
//! ## Audit
//!
//! | Outcome | Scan log entry written by |
//! |---------|---------------------------|
//! | Hop (`Transferred`, `ChainCompleted`) | the transfer batch |
//! | `MarkedDirect` | the direct-mark batch |
//! | Any rejection | a separate append, when the session is known |
//!
//! A rejection never changes chain, token or attendance state.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{PresentedToken, ScanContext, ScanOutcome, TokenOrigin};
pub use error::{ProcessResult, ScanError};
pub use ports::inbound::ScanProcessorApi;
pub use service::ScanProcessorService;
