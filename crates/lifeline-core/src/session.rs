//! The signed-in user's live habit list.
//!
//! A [`HabitSession`] follows an [`Identity`]: on sign-in it opens a feed
//! for that user, on sign-out (or a switch to another user) it tears the
//! old feed down before anything else happens. Every full snapshot and
//! every upserted record is run through the regeneration sweep, so lives
//! come back as soon as the list is looked at.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, EpochMs};
use crate::error::{CoreError, Result, StoreError};
use crate::habit::{record_relapse, run_sweep, Difficulty, HabitRecord, NewHabit, SweepReport, Vitality};
use crate::identity::{Identity, UserId};
use crate::store::{subscribe, FeedEvent, HabitFeed, HabitStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    SignedIn(UserId),
    SignedOut,
    /// A full snapshot replaced the list.
    Reloaded { habits: usize, sweep: SweepReport },
    /// One record was added, changed or removed.
    Changed,
    /// The feed reported an error; the list keeps its last good state.
    Failed(String),
    /// The store stopped delivering changes.
    FeedClosed,
}

enum Step {
    Identity(bool),
    Feed(Option<Result<FeedEvent, StoreError>>),
}

pub struct HabitSession {
    store: Arc<dyn HabitStore>,
    identity: watch::Receiver<Option<UserId>>,
    identity_pending: bool,
    clock: Arc<dyn Clock>,
    user: Option<UserId>,
    feed: Option<HabitFeed>,
    habits: Vec<HabitRecord>,
    loading: bool,
    last_sweep: Option<SweepReport>,
}

impl HabitSession {
    pub fn new(store: Arc<dyn HabitStore>, identity: &Identity, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            identity: identity.watch(),
            identity_pending: true,
            clock,
            user: None,
            feed: None,
            habits: Vec::new(),
            loading: false,
            last_sweep: None,
        }
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Newest `start_time` first.
    pub fn habits(&self) -> &[HabitRecord] {
        &self.habits
    }

    /// True from sign-in until the first snapshot or error arrives.
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn last_sweep(&self) -> Option<&SweepReport> {
        self.last_sweep.as_ref()
    }

    /// Every habit evaluated against one clock sample.
    pub fn vitalities(&self) -> Vec<Vitality> {
        let now = self.clock.now_ms();
        self.habits
            .iter()
            .map(|record| Vitality::evaluate(record, now))
            .collect()
    }

    /// Drive the session until something observable happens.
    ///
    /// Returns `None` once the identity source is gone.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        if self.identity_pending {
            self.identity_pending = false;
            let current = self.identity.borrow_and_update().clone();
            if let Some(update) = self.switch_user(current) {
                return Some(update);
            }
        }

        loop {
            let step = match self.feed.as_mut() {
                Some(feed) => tokio::select! {
                    changed = self.identity.changed() => Step::Identity(changed.is_ok()),
                    event = feed.next() => Step::Feed(event),
                },
                None => Step::Identity(self.identity.changed().await.is_ok()),
            };

            match step {
                Step::Identity(false) => {
                    self.close_feed();
                    return None;
                }
                Step::Identity(true) => {
                    let current = self.identity.borrow_and_update().clone();
                    if let Some(update) = self.switch_user(current) {
                        return Some(update);
                    }
                }
                Step::Feed(None) => {
                    self.feed = None;
                    self.loading = false;
                    return Some(SessionUpdate::FeedClosed);
                }
                Step::Feed(Some(Err(e))) => {
                    self.loading = false;
                    warn!(error = %e, "habit feed error");
                    return Some(SessionUpdate::Failed(e.to_string()));
                }
                Step::Feed(Some(Ok(event))) => return Some(self.apply_event(event).await),
            }
        }
    }

    fn close_feed(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.close();
        }
    }

    fn switch_user(&mut self, next: Option<UserId>) -> Option<SessionUpdate> {
        if next == self.user {
            return None;
        }
        self.close_feed();
        self.habits.clear();
        self.last_sweep = None;
        self.user = next.clone();

        match next {
            Some(user_id) => {
                info!(user_id = %user_id, "loading habits");
                self.loading = true;
                self.feed = Some(subscribe(self.store.clone(), &user_id));
                Some(SessionUpdate::SignedIn(user_id))
            }
            None => {
                self.loading = false;
                Some(SessionUpdate::SignedOut)
            }
        }
    }

    /// Sweep `records` on the blocking pool, handing them back afterwards.
    async fn sweep(
        &self,
        records: Vec<HabitRecord>,
        now: EpochMs,
    ) -> Result<(Vec<HabitRecord>, SweepReport), JoinError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let report = run_sweep(&*store, &records, now);
            (records, report)
        })
        .await
    }

    async fn apply_event(&mut self, event: FeedEvent) -> SessionUpdate {
        let now = self.clock.now_ms();
        match event {
            FeedEvent::Snapshot(records) => {
                let (records, sweep) = match self.sweep(records, now).await {
                    Ok(done) => done,
                    Err(e) => {
                        self.loading = false;
                        warn!(error = %e, "regeneration sweep task aborted");
                        return SessionUpdate::Failed(e.to_string());
                    }
                };
                self.habits = records;
                self.sort();
                self.loading = false;
                debug!(
                    habits = self.habits.len(),
                    regenerated = sweep.regenerated.len(),
                    "habit list reloaded"
                );
                self.last_sweep = Some(sweep.clone());
                SessionUpdate::Reloaded {
                    habits: self.habits.len(),
                    sweep,
                }
            }
            FeedEvent::Upserted(record) => {
                let (records, _) = match self.sweep(vec![record], now).await {
                    Ok(done) => done,
                    Err(e) => {
                        warn!(error = %e, "regeneration sweep task aborted");
                        return SessionUpdate::Failed(e.to_string());
                    }
                };
                for record in records {
                    match self.habits.iter_mut().find(|h| h.id == record.id) {
                        Some(existing) => *existing = record,
                        None => self.habits.push(record),
                    }
                }
                self.sort();
                SessionUpdate::Changed
            }
            FeedEvent::Removed(id) => {
                self.habits.retain(|h| h.id != id);
                SessionUpdate::Changed
            }
        }
    }

    fn sort(&mut self) {
        self.habits.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    }

    fn require_user(&self) -> Result<&str> {
        self.user.as_deref().ok_or(CoreError::NotSignedIn)
    }

    /// Create a habit for the signed-in user, starting now with full lives.
    ///
    /// # Errors
    /// [`CoreError::NotSignedIn`], validation or store errors.
    pub fn add_habit(&self, name: &str, motivation: &str, difficulty: Difficulty) -> Result<HabitRecord> {
        let owner = self.require_user()?;
        let record = NewHabit::new(owner, name, motivation, difficulty)?
            .into_record(Uuid::new_v4().to_string(), self.clock.now_ms());
        self.store.create(&record)?;
        info!(habit_id = %record.id, name = %record.name, "habit added");
        Ok(record)
    }

    /// # Errors
    /// [`CoreError::NotSignedIn`], [`CoreError::Defeated`] or store errors.
    pub fn relapse(&self, id: &str) -> Result<HabitRecord> {
        self.owned(id)?;
        record_relapse(&*self.store, id, self.clock.now_ms())
    }

    /// Returns `false` for an unknown id or someone else's habit.
    ///
    /// # Errors
    /// [`CoreError::NotSignedIn`] or store errors.
    pub fn delete(&self, id: &str) -> Result<bool> {
        match self.owned(id) {
            Ok(_) => Ok(self.store.delete(id)?),
            Err(CoreError::Store(StoreError::NotFound(_))) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn owned(&self, id: &str) -> Result<HabitRecord> {
        let owner = self.require_user()?;
        match self.store.get(id)? {
            Some(record) if record.owner_id == owner => Ok(record),
            _ => Err(StoreError::NotFound(id.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, MS_PER_DAY};
    use crate::error::DatabaseError;
    use crate::habit::HabitPatch;
    use crate::store::{ChangeNotice, MemoryStore};
    use tokio::sync::broadcast;

    /// Lists fine but cannot look up a single record.
    struct LookupFails(MemoryStore);

    impl HabitStore for LookupFails {
        fn create(&self, record: &HabitRecord) -> Result<(), StoreError> {
            self.0.create(record)
        }

        fn get(&self, _id: &str) -> Result<Option<HabitRecord>, StoreError> {
            Err(DatabaseError::Locked.into())
        }

        fn list_for_owner(&self, owner_id: &str) -> Result<Vec<HabitRecord>, StoreError> {
            self.0.list_for_owner(owner_id)
        }

        fn delete(&self, id: &str) -> Result<bool, StoreError> {
            self.0.delete(id)
        }

        fn apply(&self, id: &str, patch: &HabitPatch) -> Result<HabitRecord, StoreError> {
            self.0.apply(id, patch)
        }

        fn changes(&self) -> broadcast::Receiver<ChangeNotice> {
            self.0.changes()
        }
    }

    const T0: i64 = 1_700_000_000_000;

    fn setup() -> (Arc<MemoryStore>, Identity, Arc<ManualClock>, HabitSession) {
        let store = Arc::new(MemoryStore::new());
        let identity = Identity::new();
        let clock = Arc::new(ManualClock::new(T0));
        let session = HabitSession::new(store.clone(), &identity, clock.clone());
        (store, identity, clock, session)
    }

    #[test]
    fn signed_out_session_rejects_actions() {
        let (_store, _identity, _clock, session) = setup();
        let err = session.add_habit("Smoking", "", Difficulty::Hard).unwrap_err();
        assert!(matches!(err, CoreError::NotSignedIn));
    }

    #[test]
    fn delete_while_signed_out_is_an_error() {
        let (store, _identity, _clock, session) = setup();
        let r = NewHabit::new("u1", "Soda", "", Difficulty::Easy)
            .unwrap()
            .into_record("h1".into(), T0);
        store.create(&r).unwrap();
        assert!(matches!(session.delete("h1"), Err(CoreError::NotSignedIn)));
        assert!(store.get("h1").unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_surfaces_store_failures() {
        let store = Arc::new(LookupFails(MemoryStore::new()));
        let identity = Identity::signed_in("u1").unwrap();
        let mut session = HabitSession::new(store, &identity, Arc::new(ManualClock::new(T0)));
        session.next_update().await;
        assert!(matches!(session.next_update().await, Some(SessionUpdate::Reloaded { .. })));

        let err = session.delete("h1").unwrap_err();
        assert!(matches!(err, CoreError::Store(StoreError::Database(DatabaseError::Locked))));
    }

    #[tokio::test]
    async fn sign_in_loads_sorted_list() {
        let (store, identity, clock, mut session) = setup();
        for (id, offset) in [("a", 0), ("b", 2), ("c", 1)] {
            let r = NewHabit::new("u1", id, "", Difficulty::Easy)
                .unwrap()
                .into_record(id.into(), T0 + offset);
            store.create(&r).unwrap();
        }
        clock.set(T0 + 10);

        identity.sign_in("u1").unwrap();
        assert_eq!(session.next_update().await, Some(SessionUpdate::SignedIn("u1".into())));
        assert!(session.loading());
        assert!(matches!(session.next_update().await, Some(SessionUpdate::Reloaded { habits: 3, .. })));
        assert!(!session.loading());
        let ids: Vec<_> = session.habits().iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn snapshot_triggers_regeneration() {
        let (store, identity, clock, mut session) = setup();
        let r = NewHabit::new("u1", "Soda", "", Difficulty::Hard)
            .unwrap()
            .into_record("h1".into(), T0);
        store.create(&r).unwrap();
        record_relapse(&*store, "h1", T0).unwrap();
        clock.set(T0 + 5 * MS_PER_DAY);

        identity.sign_in("u1").unwrap();
        session.next_update().await;
        match session.next_update().await {
            Some(SessionUpdate::Reloaded { sweep, .. }) => assert_eq!(sweep.regenerated, vec!["h1".to_string()]),
            other => panic!("expected reload, got {other:?}"),
        }
        assert_eq!(session.next_update().await, Some(SessionUpdate::Changed));
        assert_eq!(session.habits()[0].current_lives, 3);
    }

    #[tokio::test]
    async fn sign_out_clears_list() {
        let (_store, identity, _clock, mut session) = setup();
        identity.sign_in("u1").unwrap();
        session.next_update().await;
        session.add_habit("Sugar", "", Difficulty::Medium).unwrap();
        session.next_update().await;
        assert_eq!(session.next_update().await, Some(SessionUpdate::Changed));
        assert_eq!(session.habits().len(), 1);

        identity.sign_out();
        assert_eq!(session.next_update().await, Some(SessionUpdate::SignedOut));
        assert!(session.habits().is_empty());
        assert!(!session.loading());
    }

    #[tokio::test]
    async fn actions_are_scoped_to_owner() {
        let (store, identity, _clock, mut session) = setup();
        let theirs = NewHabit::new("u2", "Coffee", "", Difficulty::Easy)
            .unwrap()
            .into_record("theirs".into(), T0);
        store.create(&theirs).unwrap();

        identity.sign_in("u1").unwrap();
        session.next_update().await;
        assert!(session.relapse("theirs").is_err());
        assert!(!session.delete("theirs").unwrap());
        assert_eq!(store.get("theirs").unwrap().unwrap().current_lives, 3);
    }
}
