//! Seed holder selection

use crate::error::{ChainError, ChainResult};
use shared_types::{AttendanceRecord, ChainKind, ParticipantId};

/// Pick the first `count` eligible participants, in roster order.
///
/// A participant is eligible unless already finalized for the direction the
/// chain collects. Snapshot chains accept anyone on the roster.
pub fn select_seed_holders(
    roster: &[AttendanceRecord],
    kind: ChainKind,
    count: u32,
    max: u32,
) -> ChainResult<Vec<ParticipantId>> {
    let eligible: Vec<&AttendanceRecord> = roster
        .iter()
        .filter(|record| !record.is_finalized_for(kind))
        .collect();

    if count == 0 || count > max || count as usize > eligible.len() {
        return Err(ChainError::InvalidCount {
            requested: count,
            max,
            eligible: eligible.len(),
        });
    }

    Ok(eligible
        .into_iter()
        .take(count as usize)
        .map(|record| record.student_id.clone())
        .collect())
}
