mod engine;
mod patch;
mod rank;
mod rank_watch;
mod record;
mod regeneration;
mod relapse;

pub use engine::{
    effective_anchor, elapsed_since_last_relapse, experience_points, is_eligible_for_regeneration,
    regeneration_period, regeneration_progress, reset_anchor, time_since_anchor, ElapsedUnit,
    LivesMood, StreakBand, Vitality, XP_PER_HOUR,
};
pub use patch::{HabitPatch, PatchGuard};
pub use rank::{rank_of, within_tier_progress, Rank, RankInfo};
pub use rank_watch::{best_rank, check_rank_up, RankChange, RankWatermark, LAST_SEEN_LEVEL_KEY};
pub use record::{Difficulty, HabitRecord, NewHabit, DEFAULT_MAX_LIVES};
pub use regeneration::{
    plan_sweep, regeneration_patch, reload_owner, run_sweep, sweep_owner, SweepReport,
};
pub use relapse::{record_relapse, relapse_patch};
