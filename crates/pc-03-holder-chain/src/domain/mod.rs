//! Domain layer for the Holder State Machine
//!
//! Pure rules: who may seed, whether a hop is legal, what a hop produces, and
//! how liveness codes are hashed. No I/O happens here.

pub mod challenge;
pub mod minting;
pub mod seeding;
pub mod transition;

pub use challenge::{ChallengeHasher, CHALLENGE_CODE_DIGITS};
pub use minting::mint_token;
pub use seeding::select_seed_holders;
pub use transition::{check_transfer, plan_hop, HopPlan, TransferAttempt};
