//! The signed-in user, observable.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::error::ValidationError;

pub type UserId = String;

/// Cheap to clone; every clone shares the same state.
#[derive(Clone)]
pub struct Identity {
    tx: Arc<watch::Sender<Option<UserId>>>,
}

impl Identity {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// # Errors
    /// Rejects a blank user id.
    pub fn signed_in(user_id: &str) -> Result<Self, ValidationError> {
        let identity = Self::new();
        identity.sign_in(user_id)?;
        Ok(identity)
    }

    /// Switch to `user_id`. Signing in as the current user is a no-op.
    ///
    /// # Errors
    /// Rejects a blank user id.
    pub fn sign_in(&self, user_id: &str) -> Result<(), ValidationError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "userId".into(),
                message: "must not be empty".into(),
            });
        }
        let changed = self.tx.send_if_modified(|current| {
            if current.as_deref() == Some(user_id) {
                false
            } else {
                *current = Some(user_id.to_string());
                true
            }
        });
        if changed {
            info!(user_id, "signed in");
        }
        Ok(())
    }

    pub fn sign_out(&self) {
        let changed = self.tx.send_if_modified(|current| current.take().is_some());
        if changed {
            info!("signed out");
        }
    }

    pub fn current(&self) -> Option<UserId> {
        self.tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<UserId>> {
        self.tx.subscribe()
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}
