//! Rank ladder over accumulated experience points.

use serde::Serialize;

/// Discrete rank tiers, ordered by ascending XP threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Novice,
    Committed,
    Warrior,
    Master,
    Legend,
}

impl Rank {
    pub const LADDER: [Rank; 5] = [
        Rank::Novice,
        Rank::Committed,
        Rank::Warrior,
        Rank::Master,
        Rank::Legend,
    ];

    /// Inclusive lower bound of the tier.
    pub fn min_xp(self) -> i64 {
        match self {
            Rank::Novice => 0,
            Rank::Committed => 500,
            Rank::Warrior => 1_500,
            Rank::Master => 4_000,
            Rank::Legend => 10_000,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Rank> {
        Self::LADDER.get(self.level() as usize + 1).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Rank::Novice => "Novice",
            Rank::Committed => "Committed",
            Rank::Warrior => "Warrior",
            Rank::Master => "Master",
            Rank::Legend => "Legend",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Rank::Novice => "egg",
            Rank::Committed => "sprout",
            Rank::Warrior => "swords",
            Rank::Master => "shield",
            Rank::Legend => "crown",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Rank::Novice => "#888888",
            Rank::Committed => "#4CAF50",
            Rank::Warrior => "#2196F3",
            Rank::Master => "#9C27B0",
            Rank::Legend => "#FFC107",
        }
    }

    pub fn from_level(level: u8) -> Option<Rank> {
        Self::LADDER.get(level as usize).copied()
    }

    pub fn info(self) -> RankInfo {
        RankInfo {
            rank: self,
            name: self.name(),
            icon: self.icon(),
            color: self.color(),
            level: self.level(),
            min_xp: self.min_xp(),
            next_rank_xp: self.next().map(Rank::min_xp),
        }
    }
}

/// Display data for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankInfo {
    pub rank: Rank,
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub level: u8,
    pub min_xp: i64,
    /// `None` at the top of the ladder.
    pub next_rank_xp: Option<i64>,
}

/// The tier whose `[min_xp, next_min_xp)` range contains `xp`.
///
/// Negative input lands on the bottom tier.
pub fn rank_of(xp: i64) -> RankInfo {
    Rank::LADDER
        .iter()
        .rev()
        .find(|rank| xp >= rank.min_xp())
        .copied()
        .unwrap_or(Rank::Novice)
        .info()
}

/// Fraction of the way from the current tier's floor to the next tier.
///
/// Always 1.0 at the top tier. The span is floored at 1 so malformed
/// thresholds cannot divide by zero.
pub fn within_tier_progress(xp: i64) -> f64 {
    let info = rank_of(xp);
    match info.next_rank_xp {
        None => 1.0,
        Some(next) => {
            let span = (next - info.min_xp).max(1);
            ((xp - info.min_xp) as f64 / span as f64).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        assert_eq!(rank_of(0).rank, Rank::Novice);
        assert_eq!(rank_of(499).rank, Rank::Novice);
        assert_eq!(rank_of(500).rank, Rank::Committed);
        assert_eq!(rank_of(1_499).rank, Rank::Committed);
        assert_eq!(rank_of(1_500).rank, Rank::Warrior);
        assert_eq!(rank_of(3_999).rank, Rank::Warrior);
        assert_eq!(rank_of(4_000).rank, Rank::Master);
        assert_eq!(rank_of(9_999).rank, Rank::Master);
        assert_eq!(rank_of(10_000).rank, Rank::Legend);
        assert_eq!(rank_of(i64::MAX).rank, Rank::Legend);
    }

    #[test]
    fn negative_xp_is_novice() {
        assert_eq!(rank_of(-20).level, 0);
    }

    #[test]
    fn legend_has_no_next_rank() {
        let info = rank_of(25_000);
        assert_eq!(info.level, 4);
        assert_eq!(info.next_rank_xp, None);
        assert_eq!(within_tier_progress(25_000), 1.0);
    }

    #[test]
    fn next_rank_xp_is_next_floor() {
        assert_eq!(rank_of(250).next_rank_xp, Some(500));
        assert_eq!(rank_of(4_000).next_rank_xp, Some(10_000));
    }

    #[test]
    fn tier_progress_is_relative_to_tier_floor() {
        assert_eq!(within_tier_progress(0), 0.0);
        assert_eq!(within_tier_progress(250), 0.5);
        assert_eq!(within_tier_progress(1_000), 0.5);
        assert_eq!(within_tier_progress(-100), 0.0);
    }

    #[test]
    fn levels_follow_ladder_order() {
        for (i, rank) in Rank::LADDER.iter().enumerate() {
            assert_eq!(rank.level() as usize, i);
            assert_eq!(Rank::from_level(i as u8), Some(*rank));
        }
        assert_eq!(Rank::from_level(5), None);
    }
}
