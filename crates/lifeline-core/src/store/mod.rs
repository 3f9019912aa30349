//! Storage collaborator contracts.
//!
//! A [`HabitStore`] holds habit records keyed by id and scoped by owner. All
//! mutation of lives, relapse history and the regeneration anchor goes
//! through [`HabitStore::apply`], which evaluates the patch against the
//! record it currently holds. Every successful write is announced on a
//! broadcast channel; [`subscribe`] turns that into a per-owner live feed.

mod feed;
mod memory;

pub use feed::{subscribe, FeedEvent, HabitFeed};
pub use memory::{MemoryPreferences, MemoryStore};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::habit::{HabitPatch, HabitRecord};

/// Default buffer for change notices before slow subscribers lag.
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A committed change, as broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ChangeNotice {
    Upserted(HabitRecord),
    Removed { id: String, owner_id: String },
}

impl ChangeNotice {
    pub fn owner_id(&self) -> &str {
        match self {
            ChangeNotice::Upserted(record) => &record.owner_id,
            ChangeNotice::Removed { owner_id, .. } => owner_id,
        }
    }
}

pub trait HabitStore: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] when the id is taken.
    fn create(&self, record: &HabitRecord) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<Option<HabitRecord>, StoreError>;

    fn list_for_owner(&self, owner_id: &str) -> Result<Vec<HabitRecord>, StoreError>;

    /// Remove a record. Returns whether anything was removed.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Atomically apply `patch` to the stored record and return the result.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] for an unknown id, [`StoreError::Rejected`]
    /// when the guard fails against the stored state.
    fn apply(&self, id: &str, patch: &HabitPatch) -> Result<HabitRecord, StoreError>;

    /// A fresh receiver for change notices committed after this call.
    fn changes(&self) -> broadcast::Receiver<ChangeNotice>;
}

/// Small string key-value store for per-user preferences.
pub trait PreferenceStore: Send + Sync {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
