//! Property and scenario tests for the vitality engine.

use lifeline_core::clock::{MS_PER_DAY, MS_PER_HOUR};
use lifeline_core::habit::{
    experience_points, is_eligible_for_regeneration, regeneration_period, relapse_patch,
    within_tier_progress,
};
use lifeline_core::{rank_of, run_sweep, Difficulty, HabitRecord, HabitStore, MemoryStore, NewHabit, Rank};
use proptest::prelude::*;

const T0: i64 = 1_700_000_000_000;

fn habit(difficulty: Difficulty, start: i64) -> HabitRecord {
    NewHabit::new("u1", "Smoking", "", difficulty)
        .unwrap()
        .into_record("h1".into(), start)
}

fn difficulty_strategy() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Easy),
        Just(Difficulty::Medium),
        Just(Difficulty::Hard),
        (4i64..100).prop_map(Difficulty::Unrecognized),
    ]
}

proptest! {
    #[test]
    fn defeated_habit_never_regenerates(
        difficulty in difficulty_strategy(),
        offset in 0i64..(400 * MS_PER_DAY),
    ) {
        let mut record = habit(difficulty, T0);
        record.current_lives = 0;
        record.relapse_history = vec![T0, T0, T0];
        record.last_regeneration_anchor = T0;
        prop_assert!(!is_eligible_for_regeneration(&record, T0 + offset));
    }

    #[test]
    fn full_habit_never_regenerates(
        difficulty in difficulty_strategy(),
        offset in 0i64..(400 * MS_PER_DAY),
    ) {
        let record = habit(difficulty, T0);
        prop_assert!(!is_eligible_for_regeneration(&record, T0 + offset));
    }

    #[test]
    fn rank_level_is_monotonic(a in 0i64..50_000, b in 0i64..50_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rank_of(lo).level <= rank_of(hi).level);
    }

    #[test]
    fn exactly_one_tier_contains_xp(xp in 0i64..50_000) {
        let matching: Vec<Rank> = Rank::LADDER
            .iter()
            .copied()
            .filter(|rank| {
                let upper = rank.next().map_or(i64::MAX, |next| next.min_xp());
                xp >= rank.min_xp() && xp < upper
            })
            .collect();
        prop_assert_eq!(matching.len(), 1);
        prop_assert_eq!(matching[0], rank_of(xp).rank);
    }

    #[test]
    fn tier_progress_stays_in_unit_interval(xp in -1_000i64..50_000) {
        let p = within_tier_progress(xp);
        prop_assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn relapse_then_evaluate_is_never_eligible(
        difficulty in difficulty_strategy(),
        offset in 0i64..(30 * MS_PER_DAY),
    ) {
        let mut record = habit(difficulty, T0);
        let now = T0 + offset;
        relapse_patch(now).apply_to(&mut record).unwrap();
        prop_assert!(!is_eligible_for_regeneration(&record, now));
    }

    #[test]
    fn double_sweep_increments_at_most_once(
        difficulty in difficulty_strategy(),
        lives in 1i32..3,
        extra in 0i64..(20 * MS_PER_DAY),
    ) {
        let store = MemoryStore::new();
        let mut record = habit(difficulty, T0);
        record.current_lives = lives;
        record.relapse_history = vec![T0];
        record.last_regeneration_anchor = T0;
        store.create(&record).unwrap();

        let now = T0 + regeneration_period(difficulty).num_milliseconds() + extra;
        let snapshot = vec![record];
        run_sweep(&store, &snapshot, now);
        run_sweep(&store, &snapshot, now);
        prop_assert_eq!(store.get("h1").unwrap().unwrap().current_lives, lives + 1);
    }
}

#[test]
fn regeneration_period_per_tier() {
    assert_eq!(regeneration_period(Difficulty::Easy).num_days(), 10);
    assert_eq!(regeneration_period(Difficulty::Medium).num_days(), 7);
    assert_eq!(regeneration_period(Difficulty::Hard).num_days(), 5);
    assert_eq!(regeneration_period(Difficulty::Unrecognized(0)).num_days(), 7);
}

#[test]
fn twenty_five_clean_hours_is_novice() {
    let record = habit(Difficulty::Easy, T0);
    let xp = experience_points(&record, T0 + 25 * MS_PER_HOUR);
    assert_eq!(xp, 250);
    assert_eq!(rank_of(xp).name, "Novice");
}

#[test]
fn fifty_clean_hours_lands_on_committed() {
    let record = habit(Difficulty::Easy, T0);
    let xp = experience_points(&record, T0 + 50 * MS_PER_HOUR);
    assert_eq!(xp, 500);
    assert_eq!(rank_of(xp).rank, Rank::Committed);
}

#[test]
fn hard_habit_regains_life_after_five_days() {
    let store = MemoryStore::new();
    store.create(&habit(Difficulty::Hard, T0)).unwrap();
    lifeline_core::record_relapse(&store, "h1", T0).unwrap();

    let wounded = store.get("h1").unwrap().unwrap();
    assert_eq!(wounded.current_lives, 2);
    assert!(!is_eligible_for_regeneration(&wounded, T0 + 4 * MS_PER_DAY));

    let now = T0 + 5 * MS_PER_DAY + 1_000;
    assert!(is_eligible_for_regeneration(&wounded, now));
    let report = run_sweep(&store, &[wounded], now);
    assert_eq!(report.regenerated.len(), 1);

    let healed = store.get("h1").unwrap().unwrap();
    assert_eq!(healed.current_lives, 3);
    assert_eq!(healed.last_regeneration_anchor, now);
}
