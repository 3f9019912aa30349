//! Mapping identity-provider failures to a closed set of user-facing errors.
//!
//! Providers report failures either with a typed category or just a
//! message. The category wins when present; otherwise the message is
//! matched against known phrases.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Typed failure categories an identity provider may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    InvalidCredentials,
    InvalidUser,
    UserCollision,
    WeakPassword,
}

/// A failure exactly as the provider reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProviderError {
    pub category: Option<ProviderCategory>,
    pub message: String,
}

impl AuthProviderError {
    pub fn new(category: Option<ProviderCategory>, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AuthFailure {
    BadCredentials,
    UnknownUser,
    AccountCollision,
    WeakCredential,
    MalformedIdentifier,
    Connectivity,
    RateLimited,
    ServerError,
    /// Unmatched; carries the provider's own message.
    Unknown(String),
}

impl AuthFailure {
    pub fn classify(error: &AuthProviderError) -> Self {
        if let Some(category) = error.category {
            return match category {
                ProviderCategory::InvalidCredentials => AuthFailure::BadCredentials,
                ProviderCategory::InvalidUser => AuthFailure::UnknownUser,
                ProviderCategory::UserCollision => AuthFailure::AccountCollision,
                ProviderCategory::WeakPassword => AuthFailure::WeakCredential,
            };
        }

        let message = error.message.to_lowercase();
        if message.contains("email") && message.contains("badly formatted") {
            AuthFailure::MalformedIdentifier
        } else if message.contains("network error") || message.contains("network_error") {
            AuthFailure::Connectivity
        } else if message.contains("blocked") || message.contains("too many requests") {
            AuthFailure::RateLimited
        } else if message.contains("internal error") {
            AuthFailure::ServerError
        } else {
            AuthFailure::Unknown(error.message.clone())
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AuthFailure::BadCredentials => "Wrong password or email address.".into(),
            AuthFailure::UnknownUser => "No account was found for this user.".into(),
            AuthFailure::AccountCollision => "This email address is already in use.".into(),
            AuthFailure::WeakCredential => {
                "The password is too weak. It must be at least 6 characters.".into()
            }
            AuthFailure::MalformedIdentifier => "Invalid email format.".into(),
            AuthFailure::Connectivity => "Check your internet connection.".into(),
            AuthFailure::RateLimited => "Too many attempts. Please wait a moment.".into(),
            AuthFailure::ServerError => "Server error. Please try again.".into(),
            AuthFailure::Unknown(raw) if raw.trim().is_empty() => {
                "An unknown error occurred.".into()
            }
            AuthFailure::Unknown(raw) => format!("Error: {raw}"),
        }
    }
}

impl From<&AuthProviderError> for AuthFailure {
    fn from(error: &AuthProviderError) -> Self {
        AuthFailure::classify(error)
    }
}

/// Reject a sign-in or registration form before calling the provider.
///
/// # Errors
/// [`ValidationError::BlankCredentials`] when either field is blank.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() || password.trim().is_empty() {
        return Err(ValidationError::BlankCredentials);
    }
    Ok(())
}

/// Username assigned to a new profile: the email's local part, or `user`
/// plus the first five characters of the uid.
pub fn default_username(email: Option<&str>, uid: &str) -> String {
    match email.and_then(|e| e.split('@').next()).filter(|local| !local.is_empty()) {
        Some(local) => local.to_string(),
        None => format!("user{}", uid.chars().take(5).collect::<String>()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(msg: &str) -> AuthProviderError {
        AuthProviderError::new(None, msg)
    }

    #[test]
    fn category_takes_precedence() {
        let err = AuthProviderError::new(Some(ProviderCategory::WeakPassword), "network error");
        assert_eq!(AuthFailure::classify(&err), AuthFailure::WeakCredential);
    }

    #[test]
    fn message_heuristics() {
        let cases = [
            ("The EMAIL address is badly formatted.", AuthFailure::MalformedIdentifier),
            ("A network error (such as timeout) has occurred", AuthFailure::Connectivity),
            ("ERROR_NETWORK_ERROR", AuthFailure::Connectivity),
            ("We have blocked all requests from this device", AuthFailure::RateLimited),
            ("Too many requests, try later", AuthFailure::RateLimited),
            ("An internal error has occurred", AuthFailure::ServerError),
        ];
        for (msg, expected) in cases {
            assert_eq!(AuthFailure::classify(&message(msg)), expected, "{msg}");
        }
    }

    #[test]
    fn unmatched_message_is_kept_verbatim() {
        let failure = AuthFailure::classify(&message("Quota Exceeded"));
        assert_eq!(failure, AuthFailure::Unknown("Quota Exceeded".into()));
        assert_eq!(failure.user_message(), "Error: Quota Exceeded");
    }

    #[test]
    fn blank_credentials_are_rejected() {
        assert_eq!(
            validate_credentials("  ", "secret"),
            Err(ValidationError::BlankCredentials)
        );
        assert!(validate_credentials("a@b.c", "").is_err());
        assert!(validate_credentials("a@b.c", "secret").is_ok());
    }

    #[test]
    fn default_username_prefers_email_local_part() {
        assert_eq!(default_username(Some("sam@example.com"), "abcdefgh"), "sam");
        assert_eq!(default_username(None, "abcdefgh"), "userabcde");
        assert_eq!(default_username(Some("@example.com"), "xy"), "userxy");
    }
}
