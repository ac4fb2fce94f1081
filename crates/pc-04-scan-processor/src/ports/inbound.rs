//! Driving port (API - Inbound)

use crate::domain::{PresentedToken, ScanContext, ScanOutcome};
use crate::error::ProcessResult;
use async_trait::async_trait;
use pc_01_token_codec::IssuedCode;
use shared_types::{ChainKind, IdentityClaim, SessionId};

/// Scan Processor API
#[async_trait]
pub trait ScanProcessorApi: Send + Sync {
    /// Validate a presented token and apply it for the scanning participant.
    ///
    /// Every attempt, accepted or rejected, is appended to the scan log when
    /// its session can be determined. `Err` means the scanner lacks `Scan` or
    /// the store failed.
    async fn process_scan(
        &self,
        scanner: &IdentityClaim,
        presented: PresentedToken,
        context: ScanContext,
    ) -> ProcessResult<ScanOutcome>;

    /// Fresh broadcast code for a teacher screen, using the per-kind lifetime.
    async fn issue_broadcast_code(
        &self,
        issuer: &IdentityClaim,
        session_id: SessionId,
        kind: ChainKind,
    ) -> ProcessResult<IssuedCode>;
}
