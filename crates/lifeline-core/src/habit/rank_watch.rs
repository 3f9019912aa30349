//! Rank-up detection against a persisted "last seen level" watermark.

use tracing::warn;

use super::engine;
use super::rank::{rank_of, RankInfo};
use super::record::HabitRecord;
use crate::clock::EpochMs;
use crate::error::StoreError;
use crate::store::PreferenceStore;

pub const LAST_SEEN_LEVEL_KEY: &str = "last_seen_level";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankChange {
    /// The best level rose above the watermark. Signalled once.
    Promoted(RankInfo),
    /// The best level fell below the watermark, e.g. after a deletion.
    Lowered { from: u8, to: u8 },
    Unchanged,
}

/// Per-user watermark. `None` means no level has been seen yet, so the
/// first observation of any level counts as a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RankWatermark {
    level: Option<u8>,
}

impl RankWatermark {
    pub fn new(level: Option<u8>) -> Self {
        Self { level }
    }

    pub fn level(&self) -> Option<u8> {
        self.level
    }

    /// Fold the best current rank into the watermark.
    pub fn observe(&mut self, best: Option<RankInfo>) -> RankChange {
        let Some(best) = best else {
            return RankChange::Unchanged;
        };
        match self.level {
            Some(seen) if best.level == seen => RankChange::Unchanged,
            Some(seen) if best.level < seen => {
                self.level = Some(best.level);
                RankChange::Lowered {
                    from: seen,
                    to: best.level,
                }
            }
            _ => {
                self.level = Some(best.level);
                RankChange::Promoted(best)
            }
        }
    }

    /// # Errors
    /// Propagates preference store failures. An unparsable stored value is
    /// logged and treated as unset.
    pub fn load<P: PreferenceStore + ?Sized>(prefs: &P) -> Result<Self, StoreError> {
        let level = match prefs.kv_get(LAST_SEEN_LEVEL_KEY)? {
            None => None,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) => u8::try_from(n).ok(),
                Err(e) => {
                    warn!(value = %raw, error = %e, "ignoring malformed rank watermark");
                    None
                }
            },
        };
        Ok(Self { level })
    }

    /// # Errors
    /// Propagates preference store failures.
    pub fn save<P: PreferenceStore + ?Sized>(&self, prefs: &P) -> Result<(), StoreError> {
        let raw = self.level.map_or_else(|| "-1".to_string(), |l| l.to_string());
        prefs.kv_set(LAST_SEEN_LEVEL_KEY, &raw)
    }
}

/// Highest rank across `records` at `now`; `None` for an empty set.
pub fn best_rank<'a, I>(records: I, now: EpochMs) -> Option<RankInfo>
where
    I: IntoIterator<Item = &'a HabitRecord>,
{
    records
        .into_iter()
        .map(|record| rank_of(engine::experience_points(record, now)))
        .max_by_key(|info| info.level)
}

/// Read the watermark once, fold the best rank in, and write it back only
/// when it moved.
///
/// # Errors
/// Propagates preference store failures.
pub fn check_rank_up<P>(
    records: &[HabitRecord],
    now: EpochMs,
    prefs: &P,
) -> Result<RankChange, StoreError>
where
    P: PreferenceStore + ?Sized,
{
    let mut watermark = RankWatermark::load(prefs)?;
    let change = watermark.observe(best_rank(records, now));
    if change != RankChange::Unchanged {
        watermark.save(prefs)?;
    }
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MS_PER_HOUR;
    use crate::habit::{Difficulty, NewHabit, Rank};
    use crate::store::MemoryPreferences;

    fn habit(id: &str, start: EpochMs) -> HabitRecord {
        NewHabit::new("u1", id, "", Difficulty::Easy)
            .unwrap()
            .into_record(id.into(), start)
    }

    #[test]
    fn first_observation_promotes() {
        let mut wm = RankWatermark::default();
        let change = wm.observe(Some(Rank::Novice.info()));
        assert_eq!(change, RankChange::Promoted(Rank::Novice.info()));
        assert_eq!(wm.level(), Some(0));
    }

    #[test]
    fn promotion_signals_exactly_once() {
        let mut wm = RankWatermark::new(Some(0));
        assert!(matches!(wm.observe(Some(Rank::Warrior.info())), RankChange::Promoted(_)));
        assert_eq!(wm.observe(Some(Rank::Warrior.info())), RankChange::Unchanged);
    }

    #[test]
    fn drop_lowers_silently() {
        let mut wm = RankWatermark::new(Some(3));
        assert_eq!(
            wm.observe(Some(Rank::Committed.info())),
            RankChange::Lowered { from: 3, to: 1 }
        );
        assert_eq!(wm.level(), Some(1));
    }

    #[test]
    fn empty_set_leaves_watermark() {
        let mut wm = RankWatermark::new(Some(2));
        assert_eq!(wm.observe(None), RankChange::Unchanged);
        assert_eq!(wm.level(), Some(2));
    }

    #[test]
    fn check_rank_up_persists_on_change_only() {
        let prefs = MemoryPreferences::new();
        let now = 1_000 * MS_PER_HOUR;
        let records = vec![habit("a", now - 10 * MS_PER_HOUR), habit("b", now - 60 * MS_PER_HOUR)];

        let change = check_rank_up(&records, now, &prefs).unwrap();
        assert!(matches!(change, RankChange::Promoted(info) if info.rank == Rank::Committed));
        assert_eq!(prefs.kv_get(LAST_SEEN_LEVEL_KEY).unwrap().as_deref(), Some("1"));

        assert_eq!(check_rank_up(&records, now, &prefs).unwrap(), RankChange::Unchanged);

        let change = check_rank_up(&records[..1], now, &prefs).unwrap();
        assert_eq!(change, RankChange::Lowered { from: 1, to: 0 });
        assert_eq!(prefs.kv_get(LAST_SEEN_LEVEL_KEY).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn legacy_unset_marker_loads_as_none() {
        let prefs = MemoryPreferences::new();
        prefs.kv_set(LAST_SEEN_LEVEL_KEY, "-1").unwrap();
        assert_eq!(RankWatermark::load(&prefs).unwrap().level(), None);
        prefs.kv_set(LAST_SEEN_LEVEL_KEY, "garbage").unwrap();
        assert_eq!(RankWatermark::load(&prefs).unwrap().level(), None);
    }
}
