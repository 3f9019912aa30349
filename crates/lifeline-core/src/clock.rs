//! Injected wall-clock time.
//!
//! Every engine function takes `now` as an argument; only the callers at the
//! edge (CLI, worker, session) read a [`Clock`].

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// Milliseconds since the Unix epoch.
pub type EpochMs = i64;

pub const MS_PER_HOUR: i64 = 3_600_000;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> EpochMs;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMs {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(at: EpochMs) -> Self {
        Self {
            now: AtomicI64::new(at),
        }
    }

    pub fn set(&self, at: EpochMs) {
        self.now.store(at, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> EpochMs {
        self.now.load(Ordering::SeqCst)
    }
}

/// Convert an epoch-millisecond instant to a UTC timestamp.
pub fn to_datetime(at: EpochMs) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(at)
}
