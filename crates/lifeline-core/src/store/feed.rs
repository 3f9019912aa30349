//! Per-owner live subscription over a store's change notices.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, warn};

use super::{ChangeNotice, HabitStore};
use crate::error::StoreError;
use crate::habit::HabitRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// The owner's complete record set. Always the first event, and repeated
    /// after the feed fell behind.
    Snapshot(Vec<HabitRecord>),
    Upserted(HabitRecord),
    Removed(String),
}

pub struct HabitFeed {
    store: Arc<dyn HabitStore>,
    owner_id: String,
    notices: Receiver<ChangeNotice>,
    needs_snapshot: bool,
    closed: bool,
}

/// Open a feed for `owner_id`.
///
/// The receiver is taken before the first snapshot is listed, so no write
/// committed after this call can fall between the two.
pub fn subscribe(store: Arc<dyn HabitStore>, owner_id: &str) -> HabitFeed {
    let notices = store.changes();
    debug!(owner_id, "habit feed opened");
    HabitFeed {
        store,
        owner_id: owner_id.to_string(),
        notices,
        needs_snapshot: true,
        closed: false,
    }
}

impl HabitFeed {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop delivering events; later calls to [`next`](Self::next) return `None`.
    pub fn close(&mut self) {
        if !self.closed {
            debug!(owner_id = %self.owner_id, "habit feed closed");
        }
        self.closed = true;
    }

    /// Wait for the next event for this owner.
    ///
    /// Returns `None` once the feed is closed or the store is gone. A failed
    /// snapshot is yielded as an error and retried on the following call.
    /// The snapshot listing runs on the calling task.
    pub async fn next(&mut self) -> Option<Result<FeedEvent, StoreError>> {
        if self.closed {
            return None;
        }
        if self.needs_snapshot {
            return Some(self.snapshot());
        }
        loop {
            match self.notices.recv().await {
                Ok(notice) if notice.owner_id() != self.owner_id => continue,
                Ok(ChangeNotice::Upserted(record)) => return Some(Ok(FeedEvent::Upserted(record))),
                Ok(ChangeNotice::Removed { id, .. }) => return Some(Ok(FeedEvent::Removed(id))),
                Err(RecvError::Lagged(missed)) => {
                    warn!(owner_id = %self.owner_id, missed, "habit feed lagged, resyncing");
                    // Stays set until a snapshot succeeds.
                    self.needs_snapshot = true;
                    return Some(self.snapshot());
                }
                Err(RecvError::Closed) => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    fn snapshot(&mut self) -> Result<FeedEvent, StoreError> {
        let records = self.store.list_for_owner(&self.owner_id)?;
        self.needs_snapshot = false;
        Ok(FeedEvent::Snapshot(records))
    }
}
