//! # Lifeline Core Library
//!
//! This library provides the core logic for Lifeline, a bad-habit abstinence
//! tracker. Each tracked habit carries a small pool of lives: a relapse costs
//! one, and staying clean for a difficulty-dependent period earns one back.
//! Clean time accrues experience points, which place the habit on a rank
//! ladder.
//!
//! ## Architecture
//!
//! - **Engine**: Pure functions of `(record, now)` deriving XP, rank,
//!   regeneration countdown and display state
//! - **Mutations**: Guarded patches applied atomically by the store, used by
//!   the relapse transaction and the regeneration sweep
//! - **Storage**: SQLite habit storage, an in-memory store, and TOML-based
//!   configuration
//! - **Session**: A live, per-user habit list that follows sign-in state and
//!   regenerates lives as snapshots arrive
//!
//! ## Key Components
//!
//! - [`Vitality`]: Everything a habit card shows, from one clock sample
//! - [`HabitStore`]: Storage collaborator trait
//! - [`Database`]: SQLite-backed store and preferences
//! - [`HabitSession`]: Signed-in user's list loader
//! - [`RegenerationWorker`]: Background regeneration sweep
//! - [`Config`]: Application configuration management

pub mod auth;
pub mod clock;
pub mod error;
pub mod habit;
pub mod identity;
pub mod reminder;
pub mod session;
pub mod social;
pub mod storage;
pub mod store;
pub mod worker;

pub use clock::{Clock, EpochMs, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, PatchRejected, StoreError, ValidationError};
pub use habit::{
    check_rank_up, rank_of, record_relapse, reload_owner, run_sweep, sweep_owner, Difficulty,
    HabitPatch, HabitRecord, NewHabit, PatchGuard, Rank, RankChange, RankInfo, SweepReport,
    Vitality,
};
pub use identity::{Identity, UserId};
pub use session::{HabitSession, SessionUpdate};
pub use storage::{Config, Database};
pub use store::{FeedEvent, HabitFeed, HabitStore, MemoryPreferences, MemoryStore, PreferenceStore};
pub use worker::RegenerationWorker;
