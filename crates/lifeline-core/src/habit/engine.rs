//! Vitality and progression engine.
//!
//! Pure functions of `(record, now)`. Nothing here reads the clock or touches
//! storage; list views, the friend view and the regeneration sweep all derive
//! their numbers from these functions.
//!
//! ## Anchors
//!
//! ```text
//! reset anchor        = last relapse, or start_time when history is empty
//! effective anchor    = last_regeneration_anchor if set, else reset anchor
//! ```
//!
//! Experience accrues from the reset anchor; the regeneration countdown runs
//! from the effective anchor.

use chrono::Duration;
use serde::Serialize;

use super::rank::{rank_of, within_tier_progress, RankInfo};
use super::record::{Difficulty, HabitRecord};
use crate::clock::{EpochMs, MS_PER_DAY, MS_PER_HOUR};

pub const XP_PER_HOUR: i64 = 10;

pub fn reset_anchor(record: &HabitRecord) -> EpochMs {
    record.last_relapse().unwrap_or(record.start_time)
}

pub fn effective_anchor(record: &HabitRecord) -> EpochMs {
    if record.has_regeneration_anchor() {
        record.last_regeneration_anchor
    } else {
        reset_anchor(record)
    }
}

fn clamped_since(anchor: EpochMs, now: EpochMs) -> Duration {
    Duration::milliseconds(now.saturating_sub(anchor).max(0))
}

/// Clean time since the last relapse (or creation). Zero under clock skew.
pub fn elapsed_since_last_relapse(record: &HabitRecord, now: EpochMs) -> Duration {
    clamped_since(reset_anchor(record), now)
}

/// Ten points per whole clean hour, uncapped.
pub fn experience_points(record: &HabitRecord, now: EpochMs) -> i64 {
    elapsed_since_last_relapse(record, now)
        .num_hours()
        .saturating_mul(XP_PER_HOUR)
}

pub fn regeneration_period(difficulty: Difficulty) -> Duration {
    difficulty.regeneration_period()
}

/// Time elapsed in the current regeneration countdown.
pub fn time_since_anchor(record: &HabitRecord, now: EpochMs) -> Duration {
    clamped_since(effective_anchor(record), now)
}

/// A wounded (but not defeated) habit whose countdown has run out.
pub fn is_eligible_for_regeneration(record: &HabitRecord, now: EpochMs) -> bool {
    record.current_lives > 0
        && record.current_lives < record.max_lives
        && time_since_anchor(record, now) >= regeneration_period(record.difficulty)
}

/// Countdown progress in `[0, 1]`; 0 when the period is not positive.
pub fn regeneration_progress(record: &HabitRecord, now: EpochMs) -> f64 {
    let period_ms = regeneration_period(record.difficulty).num_milliseconds();
    if period_ms <= 0 {
        return 0.0;
    }
    let since = time_since_anchor(record, now).num_milliseconds();
    (since as f64 / period_ms as f64).clamp(0.0, 1.0)
}

/// Colour band of the clean streak, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakBand {
    /// Lives are being regenerated; overrides the time bands.
    Recovering,
    /// Under a day clean.
    Fragile,
    /// Under a week.
    Building,
    /// Under a month.
    Steady,
    /// Under a year.
    Strong,
    Unbreakable,
}

impl StreakBand {
    fn classify(hours_clean: i64, regenerating: bool) -> Self {
        if regenerating {
            return StreakBand::Recovering;
        }
        match hours_clean {
            h if h < 24 => StreakBand::Fragile,
            h if h < 24 * 7 => StreakBand::Building,
            h if h < 24 * 30 => StreakBand::Steady,
            h if h < 24 * 365 => StreakBand::Strong,
            _ => StreakBand::Unbreakable,
        }
    }
}

/// How the remaining lives should be framed to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LivesMood {
    Flawless,
    Stumbled,
    LastChance,
    Holding,
    Defeated,
}

impl LivesMood {
    fn classify(record: &HabitRecord) -> Self {
        match record.current_lives {
            n if n <= 0 => LivesMood::Defeated,
            n if n == record.max_lives => LivesMood::Flawless,
            n if n == record.max_lives - 1 => LivesMood::Stumbled,
            1 => LivesMood::LastChance,
            _ => LivesMood::Holding,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            LivesMood::Flawless => "Flawless so far. With this willpower you can do anything.",
            LivesMood::Stumbled => "A small stumble, but you are still strong. Pull it together!",
            LivesMood::LastChance => "Careful! This is your last chance. Hold on to your resolve.",
            LivesMood::Holding => "No giving up, keep going!",
            LivesMood::Defeated => "This habit got the better of you. Start a new attempt when ready.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElapsedUnit {
    Hours,
    Days,
}

impl ElapsedUnit {
    pub fn label(self) -> &'static str {
        match self {
            ElapsedUnit::Hours => "hours",
            ElapsedUnit::Days => "days",
        }
    }
}

/// Derived view state for one habit at one instant.
///
/// Every field is computed from the same `now` sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vitality {
    pub now: EpochMs,
    pub elapsed_ms: i64,
    pub hours_clean: i64,
    pub experience_points: i64,
    pub rank: RankInfo,
    pub tier_progress: f64,
    /// Points still missing for the next tier; `None` at the top.
    pub xp_to_next_rank: Option<i64>,
    pub defeated: bool,
    /// `0 < lives < max`.
    pub regenerating: bool,
    pub eligible_for_regeneration: bool,
    pub regeneration_progress: f64,
    /// Countdown time left; 0 once the period has elapsed.
    pub regeneration_remaining_ms: i64,
    pub regeneration_days_total: i64,
    /// Whole days into the countdown, capped at the total.
    pub regeneration_days_passed: i64,
    pub regeneration_days_remaining: i64,
    pub band: StreakBand,
    pub mood: LivesMood,
    pub display_value: i64,
    pub display_unit: ElapsedUnit,
}

impl Vitality {
    pub fn evaluate(record: &HabitRecord, now: EpochMs) -> Self {
        let elapsed = elapsed_since_last_relapse(record, now);
        let hours_clean = elapsed.num_hours();
        let xp = hours_clean.saturating_mul(XP_PER_HOUR);
        let rank = rank_of(xp);
        let defeated = record.is_defeated();
        let regenerating = !defeated && !record.is_full();

        let days_total = record.difficulty.regeneration_days();
        let since_anchor_ms = time_since_anchor(record, now).num_milliseconds();
        let period_ms = regeneration_period(record.difficulty).num_milliseconds();
        let days_since_anchor = since_anchor_ms / MS_PER_DAY;
        let days_passed = days_since_anchor.min(days_total);

        let (display_value, display_unit) = if hours_clean < 24 {
            (hours_clean, ElapsedUnit::Hours)
        } else {
            (hours_clean / 24, ElapsedUnit::Days)
        };

        Self {
            now,
            elapsed_ms: elapsed.num_milliseconds(),
            hours_clean,
            experience_points: xp,
            rank,
            tier_progress: within_tier_progress(xp),
            xp_to_next_rank: rank.next_rank_xp.map(|next| next - xp),
            defeated,
            regenerating,
            eligible_for_regeneration: is_eligible_for_regeneration(record, now),
            regeneration_progress: regeneration_progress(record, now),
            regeneration_remaining_ms: (period_ms - since_anchor_ms).max(0),
            regeneration_days_total: days_total,
            regeneration_days_passed: days_passed,
            regeneration_days_remaining: (days_total - days_passed).max(0),
            band: StreakBand::classify(hours_clean, regenerating),
            mood: LivesMood::classify(record),
            display_value,
            display_unit,
        }
    }

    /// Hours until the countdown completes, rounded up; 0 once eligible.
    pub fn hours_until_regeneration(&self) -> i64 {
        (self.regeneration_remaining_ms + MS_PER_HOUR - 1) / MS_PER_HOUR
    }
}
