pub mod config;
pub mod habit;
pub mod rank;
pub mod reminder;
pub mod sweep;
pub mod watch;

use lifeline_core::{Config, CoreError};

/// Options shared by every command.
pub struct Context {
    user_override: Option<String>,
}

impl Context {
    pub fn new(user_override: Option<String>) -> Self {
        Self { user_override }
    }

    /// `--user` when given, otherwise the configured account.
    pub fn user_id(&self) -> Result<String, CoreError> {
        let user = match &self.user_override {
            Some(user) => user.trim().to_string(),
            None => Config::load()?.account.user_id.trim().to_string(),
        };
        if user.is_empty() {
            return Err(CoreError::NotSignedIn);
        }
        Ok(user)
    }
}
