//! The persisted habit record and its creation rules.
//!
//! Serialized field names match the stored document schema (`userId`,
//! `lastRegenerationTime`, integer `difficulty`) so records round-trip through
//! any storage collaborator unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::{EpochMs, MS_PER_DAY};
use crate::error::ValidationError;

pub const DEFAULT_MAX_LIVES: i32 = 3;

/// Difficulty tier chosen when the habit is created.
///
/// Stored as an integer. Values other than 1..=3 are kept verbatim so a
/// record written by a newer client survives a round trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
    Unrecognized(i64),
}

impl From<i64> for Difficulty {
    fn from(tier: i64) -> Self {
        match tier {
            1 => Difficulty::Easy,
            2 => Difficulty::Medium,
            3 => Difficulty::Hard,
            other => Difficulty::Unrecognized(other),
        }
    }
}

impl From<Difficulty> for i64 {
    fn from(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
            Difficulty::Unrecognized(other) => other,
        }
    }
}

impl Difficulty {
    /// Days a wounded habit must stay clean to regain one life.
    pub fn regeneration_days(self) -> i64 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 7,
            Difficulty::Hard => 5,
            Difficulty::Unrecognized(_) => 7,
        }
    }

    pub fn regeneration_period(self) -> Duration {
        Duration::milliseconds(self.regeneration_days() * MS_PER_DAY)
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Unrecognized(_) => "unrecognized",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "1" => Ok(Difficulty::Easy),
            "medium" | "2" => Ok(Difficulty::Medium),
            "hard" | "3" => Ok(Difficulty::Hard),
            other => Err(ValidationError::InvalidValue {
                field: "difficulty".into(),
                message: format!("expected easy, medium or hard, got '{other}'"),
            }),
        }
    }
}

fn default_max_lives() -> i32 {
    DEFAULT_MAX_LIVES
}

/// One tracked abstinence attempt.
///
/// `current_lives`, `relapse_history` and `last_regeneration_anchor` change
/// only through [`HabitPatch`](super::HabitPatch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "userId", default)]
    pub owner_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub motivation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub start_time: EpochMs,
    #[serde(default = "default_max_lives")]
    pub current_lives: i32,
    #[serde(default = "default_max_lives")]
    pub max_lives: i32,
    #[serde(default)]
    pub relapse_history: Vec<EpochMs>,
    /// 0 until the first relapse or regeneration.
    #[serde(rename = "lastRegenerationTime", default)]
    pub last_regeneration_anchor: EpochMs,
}

impl HabitRecord {
    pub fn last_relapse(&self) -> Option<EpochMs> {
        self.relapse_history.last().copied()
    }

    pub fn has_regeneration_anchor(&self) -> bool {
        self.last_regeneration_anchor > 0
    }

    pub fn is_defeated(&self) -> bool {
        self.current_lives <= 0
    }

    pub fn is_full(&self) -> bool {
        self.current_lives >= self.max_lives
    }

    /// Check the record-level invariants.
    ///
    /// # Errors
    /// Returns the first invariant that does not hold.
    pub fn check_invariants(&self) -> Result<(), ValidationError> {
        if self.max_lives < 1 {
            return Err(ValidationError::InvalidValue {
                field: "maxLives".into(),
                message: format!("must be at least 1, got {}", self.max_lives),
            });
        }
        if !(0..=self.max_lives).contains(&self.current_lives) {
            return Err(ValidationError::LivesOutOfRange {
                current: self.current_lives,
                max: self.max_lives,
            });
        }
        if let Some(index) = self
            .relapse_history
            .windows(2)
            .position(|pair| pair[1] < pair[0])
        {
            return Err(ValidationError::HistoryOutOfOrder { index: index + 1 });
        }
        if let (true, Some(last_relapse)) = (self.has_regeneration_anchor(), self.last_relapse()) {
            if self.last_regeneration_anchor < last_relapse {
                return Err(ValidationError::AnchorBehindRelapse {
                    anchor: self.last_regeneration_anchor,
                    last_relapse,
                });
            }
        }
        Ok(())
    }
}

/// A validated request to start tracking a habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHabit {
    owner_id: String,
    name: String,
    motivation: String,
    difficulty: Difficulty,
    max_lives: i32,
}

impl NewHabit {
    /// # Errors
    /// Rejects a blank name or owner.
    pub fn new(
        owner_id: &str,
        name: &str,
        motivation: &str,
        difficulty: Difficulty,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "userId".into(),
                message: "owner must not be empty".into(),
            });
        }
        Ok(Self {
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            motivation: motivation.trim().to_string(),
            difficulty,
            max_lives: DEFAULT_MAX_LIVES,
        })
    }

    /// # Errors
    /// Rejects fewer than one life.
    pub fn with_max_lives(mut self, max_lives: i32) -> Result<Self, ValidationError> {
        if max_lives < 1 {
            return Err(ValidationError::InvalidValue {
                field: "maxLives".into(),
                message: format!("must be at least 1, got {max_lives}"),
            });
        }
        self.max_lives = max_lives;
        Ok(self)
    }

    pub fn into_record(self, id: String, now: EpochMs) -> HabitRecord {
        HabitRecord {
            id,
            owner_id: self.owner_id,
            name: self.name,
            motivation: self.motivation,
            difficulty: self.difficulty,
            start_time: now,
            current_lives: self.max_lives,
            max_lives: self.max_lives,
            relapse_history: Vec::new(),
            last_regeneration_anchor: 0,
        }
    }
}
