//! Profile and friend-view data contracts.
//!
//! Friend graph mutations happen in the hosting backend. What lives here is
//! the shape of a profile document, the checks done before a request is
//! sent, and the read-only view of a friend's habits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::EpochMs;
use crate::error::ValidationError;
use crate::habit::{best_rank, HabitRecord, RankInfo, Vitality};

pub const DEFAULT_AVATAR: &str = "default";

/// Selectable avatar ids. `default` renders the same as `lion`.
pub const AVATARS: [&str; 6] = ["default", "lion", "owl", "bull", "cat", "squirrel"];

fn default_avatar() -> String {
    DEFAULT_AVATAR.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_avatar")]
    pub avatar_id: String,
    #[serde(default)]
    pub friends: Vec<String>,
    #[serde(default)]
    pub sent_requests: Vec<String>,
    #[serde(default)]
    pub received_requests: Vec<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            uid: String::new(),
            email: String::new(),
            username: String::new(),
            avatar_id: default_avatar(),
            friends: Vec::new(),
            sent_requests: Vec::new(),
            received_requests: Vec::new(),
        }
    }
}

impl UserProfile {
    /// The avatar to render; unknown ids fall back to the default.
    pub fn avatar(&self) -> &str {
        resolve_avatar(&self.avatar_id)
    }

    /// # Errors
    /// Refuses a request to oneself, to an existing friend, or one already pending.
    pub fn check_friend_request(&self, target_uid: &str) -> Result<(), FriendRequestRefused> {
        if target_uid == self.uid {
            return Err(FriendRequestRefused::SelfRequest);
        }
        if self.friends.iter().any(|f| f == target_uid) {
            return Err(FriendRequestRefused::AlreadyFriends);
        }
        if self.sent_requests.iter().any(|f| f == target_uid) {
            return Err(FriendRequestRefused::AlreadySent);
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendRequestRefused {
    #[error("You can't add yourself")]
    SelfRequest,
    #[error("You are already friends")]
    AlreadyFriends,
    #[error("A request has already been sent")]
    AlreadySent,
}

pub fn resolve_avatar(id: &str) -> &str {
    AVATARS
        .iter()
        .copied()
        .find(|known| *known == id)
        .unwrap_or(DEFAULT_AVATAR)
}

/// Normalize a username search.
///
/// # Errors
/// [`ValidationError::BlankQuery`] for an empty or whitespace query.
pub fn validate_search_query(query: &str) -> Result<String, ValidationError> {
    let normalized = query.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ValidationError::BlankQuery);
    }
    Ok(normalized)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendHabitView {
    pub id: String,
    pub name: String,
    pub vitality: Vitality,
}

/// A friend's habits as seen by someone else, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendSummary {
    pub uid: String,
    pub username: String,
    pub avatar_id: String,
    pub best_rank: Option<RankInfo>,
    pub habits: Vec<FriendHabitView>,
}

impl FriendSummary {
    /// Records not owned by `profile` are ignored.
    pub fn from_records(profile: &UserProfile, records: &[HabitRecord], now: EpochMs) -> Self {
        let mut owned: Vec<&HabitRecord> = records
            .iter()
            .filter(|r| r.owner_id == profile.uid)
            .collect();
        owned.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        let best = best_rank(owned.iter().copied(), now);

        Self {
            uid: profile.uid.clone(),
            username: profile.username.clone(),
            avatar_id: profile.avatar().to_string(),
            best_rank: best,
            habits: owned
                .into_iter()
                .map(|r| FriendHabitView {
                    id: r.id.clone(),
                    name: r.name.clone(),
                    vitality: Vitality::evaluate(r, now),
                })
                .collect(),
        }
    }
}
