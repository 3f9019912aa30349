//! In-process store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use super::{ChangeNotice, HabitStore, PreferenceStore, CHANGE_CHANNEL_CAPACITY};
use crate::error::StoreError;
use crate::habit::{HabitPatch, HabitRecord};

/// Records behind one mutex; patches are applied while it is held.
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, HabitRecord>>,
    changes: broadcast::Sender<ChangeNotice>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(CHANGE_CHANNEL_CAPACITY)
    }

    /// `capacity` bounds how far a subscriber may fall behind before lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            records: Mutex::new(BTreeMap::new()),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, HabitRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notice: ChangeNotice) {
        // No receivers is fine.
        let _ = self.changes.send(notice);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitStore for MemoryStore {
    fn create(&self, record: &HabitRecord) -> Result<(), StoreError> {
        {
            let mut records = self.lock();
            if records.contains_key(&record.id) {
                return Err(StoreError::AlreadyExists(record.id.clone()));
            }
            records.insert(record.id.clone(), record.clone());
        }
        self.notify(ChangeNotice::Upserted(record.clone()));
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<HabitRecord>, StoreError> {
        Ok(self.lock().get(id).cloned())
    }

    fn list_for_owner(&self, owner_id: &str) -> Result<Vec<HabitRecord>, StoreError> {
        Ok(self
            .lock()
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.lock().remove(id);
        match removed {
            Some(record) => {
                self.notify(ChangeNotice::Removed {
                    id: record.id,
                    owner_id: record.owner_id,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn apply(&self, id: &str, patch: &HabitPatch) -> Result<HabitRecord, StoreError> {
        let updated = {
            let mut records = self.lock();
            let record = records
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            patch
                .apply_to(record)
                .map_err(|reason| StoreError::Rejected {
                    id: id.to_string(),
                    reason,
                })?;
            record.clone()
        };
        self.notify(ChangeNotice::Upserted(updated.clone()));
        Ok(updated)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeNotice> {
        self.changes.subscribe()
    }
}

/// Preferences kept in a map, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
