//! Core error types for lifeline-core.
//!
//! This module defines the error hierarchy using thiserror. Store
//! collaborators, the engine's mutation boundary and the configuration layer
//! each get their own enum; [`CoreError`] ties them together for callers.

use std::path::PathBuf;
use thiserror::Error;

use crate::clock::EpochMs;

/// Core error type for lifeline-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors, raised before any storage call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage collaborator errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A relapse was requested on a habit with no lives left
    #[error("Habit '{id}' is defeated and cannot relapse further")]
    Defeated { id: String },

    /// An operation needs a signed-in user
    #[error("No user is signed in")]
    NotSignedIn,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// The data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDirUnavailable(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Habit name is empty or whitespace
    #[error("Habit name must not be empty")]
    EmptyName,

    /// Search query is empty or whitespace
    #[error("Search query must not be blank")]
    BlankQuery,

    /// Sign-in form left a field blank
    #[error("Email and password are both required")]
    BlankCredentials,

    /// Lives counter outside `[0, max_lives]`
    #[error("current_lives {current} is outside [0, {max}]")]
    LivesOutOfRange { current: i32, max: i32 },

    /// Relapse history not in chronological order
    #[error("relapse history is out of order at index {index}")]
    HistoryOutOfOrder { index: usize },

    /// Regeneration anchor earlier than the last relapse
    #[error("regeneration anchor {anchor} precedes last relapse {last_relapse}")]
    AnchorBehindRelapse { anchor: EpochMs, last_relapse: EpochMs },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Why a [`HabitPatch`](crate::habit::HabitPatch) was refused by the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchRejected {
    #[error("habit has no lives left")]
    NoLivesLeft,

    #[error("habit is not eligible for regeneration")]
    NotEligible,

    #[error("patch would break record invariants: {0}")]
    Invariant(#[from] ValidationError),
}

/// Errors surfaced by a [`HabitStore`](crate::store::HabitStore) or
/// [`PreferenceStore`](crate::store::PreferenceStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Habit not found: {0}")]
    NotFound(String),

    #[error("Habit already exists: {0}")]
    AlreadyExists(String),

    /// The conditional update did not hold against the stored record
    #[error("Update to habit '{id}' rejected: {reason}")]
    Rejected {
        id: String,
        #[source]
        reason: PatchRejected,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// A stored row could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }

    #[test]
    fn rejected_store_error_names_the_habit() {
        let err = StoreError::Rejected {
            id: "h1".into(),
            reason: PatchRejected::NoLivesLeft,
        };
        assert_eq!(
            err.to_string(),
            "Update to habit 'h1' rejected: habit has no lives left"
        );
    }
}
