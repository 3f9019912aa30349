//! Field-level conditional updates.
//!
//! A [`HabitPatch`] describes a delta (lives +/- n, anchor, relapse append)
//! plus a guard. Stores evaluate the guard and apply the delta against the
//! record they currently hold, inside their own lock or transaction, so a
//! relapse and a regeneration issued concurrently both land on fresh state
//! instead of clobbering each other's snapshot.

use serde::{Deserialize, Serialize};

use super::engine;
use super::record::HabitRecord;
use crate::clock::EpochMs;
use crate::error::PatchRejected;

/// Precondition checked against the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatchGuard {
    #[default]
    None,
    /// At least one life left.
    HasLives,
    /// The record is still eligible for regeneration at `now`.
    EligibleForRegeneration { now: EpochMs },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HabitPatch {
    pub lives_delta: i32,
    pub anchor: Option<EpochMs>,
    pub append_relapse: Option<EpochMs>,
    pub guard: PatchGuard,
}

impl HabitPatch {
    fn check_guard(&self, record: &HabitRecord) -> Result<(), PatchRejected> {
        match self.guard {
            PatchGuard::None => Ok(()),
            PatchGuard::HasLives if record.current_lives <= 0 => Err(PatchRejected::NoLivesLeft),
            PatchGuard::HasLives => Ok(()),
            PatchGuard::EligibleForRegeneration { now } => {
                if engine::is_eligible_for_regeneration(record, now) {
                    Ok(())
                } else {
                    Err(PatchRejected::NotEligible)
                }
            }
        }
    }

    /// Apply to `record` in place, or leave it untouched on rejection.
    ///
    /// Lives are clamped to `[0, max_lives]`. An appended relapse never sorts
    /// before the previous one, and the anchor only moves forward and never
    /// behind the last relapse.
    ///
    /// # Errors
    /// Returns why the guard failed, or which invariant the result would break.
    pub fn apply_to(&self, record: &mut HabitRecord) -> Result<(), PatchRejected> {
        self.check_guard(record)?;

        let mut next = record.clone();
        next.current_lives = next
            .current_lives
            .saturating_add(self.lives_delta)
            .clamp(0, next.max_lives);

        if let Some(at) = self.append_relapse {
            let at = next.last_relapse().map_or(at, |last| at.max(last));
            next.relapse_history.push(at);
        }

        if let Some(anchor) = self.anchor {
            let floor = next.last_relapse().unwrap_or(anchor);
            next.last_regeneration_anchor = next
                .last_regeneration_anchor
                .max(anchor)
                .max(floor);
        }

        next.check_invariants()?;
        *record = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MS_PER_DAY;
    use crate::habit::{Difficulty, NewHabit};

    fn wounded() -> HabitRecord {
        let mut r = NewHabit::new("u1", "Sugar", "", Difficulty::Hard)
            .unwrap()
            .into_record("h1".into(), 0);
        r.current_lives = 2;
        r.relapse_history = vec![100];
        r.last_regeneration_anchor = 100;
        r
    }

    #[test]
    fn has_lives_guard_rejects_defeated() {
        let mut r = wounded();
        r.current_lives = 0;
        let before = r.clone();
        let patch = HabitPatch {
            lives_delta: -1,
            guard: PatchGuard::HasLives,
            ..Default::default()
        };
        assert_eq!(patch.apply_to(&mut r), Err(PatchRejected::NoLivesLeft));
        assert_eq!(r, before);
    }

    #[test]
    fn regeneration_guard_uses_stored_state() {
        let mut r = wounded();
        let now = 100 + 5 * MS_PER_DAY;
        let patch = HabitPatch {
            lives_delta: 1,
            anchor: Some(now),
            guard: PatchGuard::EligibleForRegeneration { now },
            ..Default::default()
        };
        patch.apply_to(&mut r).unwrap();
        assert_eq!(r.current_lives, 3);
        assert_eq!(r.last_regeneration_anchor, now);
        assert_eq!(patch.apply_to(&mut r), Err(PatchRejected::NotEligible));
        assert_eq!(r.current_lives, 3);
    }

    #[test]
    fn lives_are_clamped() {
        let mut r = wounded();
        let patch = HabitPatch {
            lives_delta: 10,
            ..Default::default()
        };
        patch.apply_to(&mut r).unwrap();
        assert_eq!(r.current_lives, r.max_lives);

        let patch = HabitPatch {
            lives_delta: -10,
            ..Default::default()
        };
        patch.apply_to(&mut r).unwrap();
        assert_eq!(r.current_lives, 0);
    }

    #[test]
    fn anchor_never_moves_backward() {
        let mut r = wounded();
        r.last_regeneration_anchor = 500;
        let patch = HabitPatch {
            anchor: Some(200),
            ..Default::default()
        };
        patch.apply_to(&mut r).unwrap();
        assert_eq!(r.last_regeneration_anchor, 500);
    }

    #[test]
    fn skewed_relapse_keeps_history_ordered() {
        let mut r = wounded();
        let patch = HabitPatch {
            lives_delta: -1,
            anchor: Some(50),
            append_relapse: Some(50),
            guard: PatchGuard::HasLives,
        };
        patch.apply_to(&mut r).unwrap();
        assert_eq!(r.relapse_history, vec![100, 100]);
        assert_eq!(r.last_regeneration_anchor, 100);
        assert!(r.check_invariants().is_ok());
    }
}
