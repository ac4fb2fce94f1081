//! Domain layer for the Scan Processor

pub mod outcome;
pub mod presented;

pub use outcome::{codec_rejection, ScanOutcome};
pub use presented::{PresentedToken, ScanContext, TokenOrigin};
