//! # On-Demand Token Refresher Subsystem
//!
//! `get_or_refresh_token(chain_id, holder_id)` is what a holder's client polls
//! to keep its QR code current.
//!
//! | Current token | Result |
//! |---------------|--------|
//! | Live, `now < expires_at` | returned unchanged |
//! | Live, expired | replaced at the same sequence, old one `Superseded` |
//! | Caller is not the holder | `NotHolder` |
//! | Chain closed | `ChainClosed` |
//!
//! The replacement is one conditional batch (chain, old token, new token).
//! Two overlapping polls race on the chain's version; the loser re-reads and
//! returns the winner's token, so at most one token per chain is ever live.
//! A pending liveness challenge that has not expired moves to the replacement.

pub mod error;
pub mod ports;
pub mod service;

pub use error::{RefreshError, RefreshResult};
pub use ports::inbound::{RefreshedToken, RefreshedTokenWire, TokenRefreshApi};
pub use service::{RefreshConfig, TokenRefreshService};
