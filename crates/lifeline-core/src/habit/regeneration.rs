//! Regeneration sweep.
//!
//! Given a user's records and one `now` sample, restore a life on every
//! record whose countdown has run out. Each write is an independent
//! conditional update: a record that stopped being eligible in the meantime
//! (a relapse landed first, or a previous sweep already regenerated it) is
//! skipped, and a failed write never stops the rest of the pass.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::engine;
use super::patch::{HabitPatch, PatchGuard};
use super::record::HabitRecord;
use crate::clock::EpochMs;
use crate::error::StoreError;
use crate::store::HabitStore;

/// One life back, countdown restarted at `now`.
pub fn regeneration_patch(now: EpochMs) -> HabitPatch {
    HabitPatch {
        lives_delta: 1,
        anchor: Some(now),
        append_relapse: None,
        guard: PatchGuard::EligibleForRegeneration { now },
    }
}

/// Records the sweep would touch at `now`.
pub fn plan_sweep(records: &[HabitRecord], now: EpochMs) -> Vec<&HabitRecord> {
    records
        .iter()
        .filter(|record| engine::is_eligible_for_regeneration(record, now))
        .collect()
}

/// Outcome of one pass, by habit id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub regenerated: Vec<String>,
    /// Eligible in the caller's snapshot but not in the store.
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.regenerated.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Run one best-effort pass over `records`.
pub fn run_sweep<S>(store: &S, records: &[HabitRecord], now: EpochMs) -> SweepReport
where
    S: HabitStore + ?Sized,
{
    let mut report = SweepReport::default();
    for record in plan_sweep(records, now) {
        match store.apply(&record.id, &regeneration_patch(now)) {
            Ok(updated) => {
                info!(
                    habit_id = %updated.id,
                    lives = updated.current_lives,
                    max_lives = updated.max_lives,
                    "life regenerated"
                );
                report.regenerated.push(updated.id);
            }
            Err(e @ (StoreError::Rejected { .. } | StoreError::NotFound(_))) => {
                debug!(habit_id = %record.id, reason = %e, "regeneration skipped");
                report.skipped.push(record.id.clone());
            }
            Err(e) => {
                warn!(habit_id = %record.id, error = %e, "regeneration write failed");
                report.failed.push(record.id.clone());
            }
        }
    }
    report
}

/// Load the owner's records and sweep them.
///
/// # Errors
/// Only the initial listing can fail; per-record failures land in the report.
pub fn sweep_owner<S>(store: &S, owner_id: &str, now: EpochMs) -> Result<SweepReport, StoreError>
where
    S: HabitStore + ?Sized,
{
    let records = store.list_for_owner(owner_id)?;
    Ok(run_sweep(store, &records, now))
}

/// A full reload: list the owner's records, sweep them, and list again when
/// anything regenerated so the returned records show the restored lives.
///
/// # Errors
/// Propagates listing failures; per-record failures land in the report.
pub fn reload_owner<S>(
    store: &S,
    owner_id: &str,
    now: EpochMs,
) -> Result<(Vec<HabitRecord>, SweepReport), StoreError>
where
    S: HabitStore + ?Sized,
{
    let records = store.list_for_owner(owner_id)?;
    let report = run_sweep(store, &records, now);
    if report.regenerated.is_empty() {
        return Ok((records, report));
    }
    Ok((store.list_for_owner(owner_id)?, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MS_PER_DAY;
    use crate::habit::{record_relapse, Difficulty, NewHabit};
    use crate::store::MemoryStore;

    const T0: EpochMs = 1_000_000;

    fn store_with(difficulty: Difficulty) -> MemoryStore {
        let store = MemoryStore::new();
        let record = NewHabit::new("u1", "Gaming", "", difficulty)
            .unwrap()
            .into_record("h1".into(), T0);
        store.create(&record).unwrap();
        store
    }

    #[test]
    fn hard_habit_regenerates_after_five_days() {
        let store = store_with(Difficulty::Hard);
        record_relapse(&store, "h1", T0).unwrap();

        let report = sweep_owner(&store, "u1", T0 + 4 * MS_PER_DAY).unwrap();
        assert!(report.is_empty());

        let now = T0 + 5 * MS_PER_DAY + 1_000;
        let report = sweep_owner(&store, "u1", now).unwrap();
        assert_eq!(report.regenerated, vec!["h1".to_string()]);
        let r = store.get("h1").unwrap().unwrap();
        assert_eq!(r.current_lives, 3);
        assert_eq!(r.last_regeneration_anchor, now);
    }

    #[test]
    fn stale_snapshot_regenerates_at_most_once() {
        let store = store_with(Difficulty::Medium);
        record_relapse(&store, "h1", T0).unwrap();
        record_relapse(&store, "h1", T0).unwrap();
        let snapshot = store.list_for_owner("u1").unwrap();
        let now = T0 + 7 * MS_PER_DAY;

        let first = run_sweep(&store, &snapshot, now);
        let second = run_sweep(&store, &snapshot, now);
        assert_eq!(first.regenerated.len(), 1);
        assert!(second.regenerated.is_empty());
        assert_eq!(second.skipped, vec!["h1".to_string()]);
        assert_eq!(store.get("h1").unwrap().unwrap().current_lives, 2);
    }

    #[test]
    fn relapse_between_snapshot_and_write_wins() {
        let store = store_with(Difficulty::Hard);
        record_relapse(&store, "h1", T0).unwrap();
        let snapshot = store.list_for_owner("u1").unwrap();
        let now = T0 + 6 * MS_PER_DAY;
        record_relapse(&store, "h1", now - 1).unwrap();

        let report = run_sweep(&store, &snapshot, now);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(store.get("h1").unwrap().unwrap().current_lives, 1);
    }

    #[test]
    fn reload_returns_regenerated_records() {
        let store = store_with(Difficulty::Hard);
        record_relapse(&store, "h1", T0).unwrap();

        let (records, report) = reload_owner(&store, "u1", T0 + 6 * MS_PER_DAY).unwrap();
        assert_eq!(report.regenerated, vec!["h1".to_string()]);
        assert_eq!(records[0].current_lives, 3);

        let (records, report) = reload_owner(&store, "u1", T0 + 6 * MS_PER_DAY).unwrap();
        assert!(report.is_empty());
        assert_eq!(records[0].current_lives, 3);
    }

    #[test]
    fn defeated_habits_are_not_planned() {
        let store = store_with(Difficulty::Hard);
        for at in [T0, T0 + 1, T0 + 2] {
            record_relapse(&store, "h1", at).unwrap();
        }
        let records = store.list_for_owner("u1").unwrap();
        assert!(plan_sweep(&records, T0 + 365 * MS_PER_DAY).is_empty());
    }
}
