//! # Per-Kind Lifetimes
//!
//! Chain tokens and broadcast codes each carry a lifetime that depends on the
//! chain kind, so ENTRY and LATE can be tuned independently.

use crate::entities::ChainKind;
use crate::time::secs_to_millis;
use serde::{Deserialize, Serialize};

/// Default chain-token lifetime.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 10;

/// Default broadcast-code lifetime.
pub const DEFAULT_BROADCAST_TTL_SECS: u64 = 20;

/// Lifetime in seconds for each chain kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTtl {
    pub entry: u64,
    pub exit: u64,
    pub late: u64,
    pub early: u64,
    pub snapshot: u64,
}

impl KindTtl {
    /// Same lifetime for every kind.
    pub const fn uniform(secs: u64) -> Self {
        Self {
            entry: secs,
            exit: secs,
            late: secs,
            early: secs,
            snapshot: secs,
        }
    }

    /// Override one kind (builder style).
    #[must_use]
    pub fn with(mut self, kind: ChainKind, secs: u64) -> Self {
        *self.slot_mut(kind) = secs;
        self
    }

    /// Lifetime in seconds.
    pub fn secs(&self, kind: ChainKind) -> u64 {
        match kind {
            ChainKind::Entry => self.entry,
            ChainKind::Exit => self.exit,
            ChainKind::Late => self.late,
            ChainKind::Early => self.early,
            ChainKind::Snapshot => self.snapshot,
        }
    }

    /// Lifetime in milliseconds.
    pub fn millis(&self, kind: ChainKind) -> u64 {
        secs_to_millis(self.secs(kind))
    }

    /// First kind configured with a zero lifetime, if any.
    pub fn zero_kind(&self) -> Option<ChainKind> {
        ChainKind::ALL.into_iter().find(|kind| self.secs(*kind) == 0)
    }

    fn slot_mut(&mut self, kind: ChainKind) -> &mut u64 {
        match kind {
            ChainKind::Entry => &mut self.entry,
            ChainKind::Exit => &mut self.exit,
            ChainKind::Late => &mut self.late,
            ChainKind::Early => &mut self.early,
            ChainKind::Snapshot => &mut self.snapshot,
        }
    }
}
