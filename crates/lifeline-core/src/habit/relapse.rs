//! The relapse transaction.

use tracing::info;

use super::patch::{HabitPatch, PatchGuard};
use super::record::HabitRecord;
use crate::clock::EpochMs;
use crate::error::{CoreError, PatchRejected, Result, StoreError};
use crate::store::HabitStore;

/// Lose one life, restart the countdown and log the relapse, all at `now`.
pub fn relapse_patch(now: EpochMs) -> HabitPatch {
    HabitPatch {
        lives_delta: -1,
        anchor: Some(now),
        append_relapse: Some(now),
        guard: PatchGuard::HasLives,
    }
}

/// Record a user-confirmed relapse as one atomic update.
///
/// # Errors
/// [`CoreError::Defeated`] when the stored record has no lives left;
/// store errors otherwise.
pub fn record_relapse<S>(store: &S, id: &str, now: EpochMs) -> Result<HabitRecord>
where
    S: HabitStore + ?Sized,
{
    match store.apply(id, &relapse_patch(now)) {
        Ok(record) => {
            info!(
                habit_id = %record.id,
                lives = record.current_lives,
                relapses = record.relapse_history.len(),
                "relapse recorded"
            );
            Ok(record)
        }
        Err(StoreError::Rejected {
            reason: PatchRejected::NoLivesLeft,
            ..
        }) => Err(CoreError::Defeated { id: id.to_string() }),
        Err(e) => Err(e.into()),
    }
}
