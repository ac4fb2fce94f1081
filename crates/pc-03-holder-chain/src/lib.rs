//! # Holder State Machine Subsystem
//!
//! Owns chain lifecycle, current-holder assignment and rotation counters.
//!
//! ## State Machine
//!
//! ```text
//! seed ──► [SEEDED] ──transfer──► [ACTIVE] ──transfer──► [ACTIVE] ...
//!              │                     │
//!              │                     ├── closing hop (ClosingRule met) ──► [CLOSED]
//!              └─────── close ───────┴── close / close_session_chains ──► [CLOSED]
//! ```
//!
//! ## Transfer Checks (in order)
//!
//! | Check | Error |
//! |-------|-------|
//! | Chain closed | `ChainClosed` |
//! | Token not of this chain | `UnknownToken` |
//! | Token consumed, superseded or revoked | `StaleToken` |
//! | Claimed holder is not the holder | `NotHolder` |
//! | Scanner is the holder | `SelfTransfer` |
//! | `now >= expires_at` | `Expired` |
//! | Pending challenge unmet | `ChallengeFailed` |
//! | Scanner already finalized for the direction | `AlreadyMarked` |
//!
//! A successful hop is one atomic batch: chain update (version-checked),
//! consumed token, successor token, scan log entry and the receiver's
//! attendance mark. Losing the batch race re-runs the checks once; if the chain
//! moved on the retry reports `StaleToken`.
//!
//! ## Architecture
//!
//! - `domain/` - seeding, transition and challenge rules (pure)
//! - `ports/inbound.rs` - `HolderChainApi`
//! - `ports/outbound.rs` - `NotifySink`
//! - `adapters/` - event-bus, no-op and recording notify sinks
//! - `service.rs` - `HolderChainService`

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{EventBusNotifySink, NoopNotifySink, RecordingNotifySink};
pub use domain::{mint_token, ChallengeHasher, CHALLENGE_CODE_DIGITS};
pub use error::{ChainError, ChainResult, NotifyError};
pub use ports::inbound::{
    HolderChainApi, IssuedChallenge, SeedRequest, SeededChain, TransferReceipt, TransferRequest,
};
pub use ports::outbound::NotifySink;
pub use service::{
    HolderChainConfig, HolderChainService, DEFAULT_CHALLENGE_TTL_SECS, DEFAULT_MAX_CHAINS_PER_SEED,
};
