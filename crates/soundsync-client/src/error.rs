//! Client error types.
//!
//! `AuthError` and `DownloadError` display the exact text shown to the user;
//! the underlying cause is logged, never surfaced.

use thiserror::Error;

use soundsync_firestore::FirestoreError;
use soundsync_models::ModelError;
use soundsync_storage::StorageError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Media(#[from] ModelError),

    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Generation trigger failed: {0}")]
    Trigger(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn trigger(msg: impl Into<String>) -> Self {
        Self::Trigger(msg.into())
    }
}

/// Authentication failure, displayed as a user-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid email address.")]
    InvalidEmail,

    #[error("No account found with this email.")]
    EmailNotFound,

    #[error("Incorrect password.")]
    IncorrectPassword,

    #[error("Email already in use.")]
    EmailExists,

    #[error("Password should be at least 6 characters.")]
    WeakPassword,

    #[error("Popup closed before completing sign in.")]
    PopupClosed,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    /// The provider could not be reached
    #[error("Something went wrong. Please try again.")]
    Network,

    /// Anything else; the provider code is kept for logs
    #[error("Something went wrong. Please try again.")]
    Other(String),
}

impl AuthError {
    /// Map a provider error code to its message.
    ///
    /// Accepts both REST codes (`EMAIL_EXISTS`, `WEAK_PASSWORD : ...`) and
    /// web SDK codes (`auth/email-already-in-use`).
    pub fn from_code(code: &str) -> Self {
        let code = code.split([' ', ':']).next().unwrap_or_default();
        match code {
            "INVALID_EMAIL" | "auth/invalid-email" => Self::InvalidEmail,
            "EMAIL_NOT_FOUND" | "auth/user-not-found" => Self::EmailNotFound,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "auth/wrong-password" | "auth/invalid-credential" => {
                Self::IncorrectPassword
            }
            "EMAIL_EXISTS" | "auth/email-already-in-use" => Self::EmailExists,
            "WEAK_PASSWORD" | "auth/weak-password" => Self::WeakPassword,
            "USER_CANCELLED" | "auth/popup-closed-by-user" | "auth/cancelled-popup-request" => Self::PopupClosed,
            other => Self::Other(other.to_string()),
        }
    }

    /// True when the provider refused the refresh token itself.
    ///
    /// Only these end the session; transport and server failures leave it intact.
    pub fn revokes_session(&self) -> bool {
        match self {
            Self::EmailNotFound => true,
            Self::Other(code) => matches!(
                code.as_str(),
                "TOKEN_EXPIRED"
                    | "INVALID_REFRESH_TOKEN"
                    | "INVALID_GRANT_TYPE"
                    | "MISSING_REFRESH_TOKEN"
                    | "USER_DISABLED"
                    | "USER_NOT_FOUND"
            ),
            _ => false,
        }
    }
}

/// Download failure, displayed as a user-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// No storage path yet; nothing was requested
    #[error("No downloadable file on this project yet.")]
    NotReady,

    /// Resolution or fetch failed, cause intentionally hidden
    #[error("File isn't ready yet. Try again shortly.")]
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_code_mapping() {
        assert_eq!(AuthError::from_code("INVALID_EMAIL"), AuthError::InvalidEmail);
        assert_eq!(AuthError::from_code("EMAIL_NOT_FOUND"), AuthError::EmailNotFound);
        assert_eq!(AuthError::from_code("INVALID_LOGIN_CREDENTIALS"), AuthError::IncorrectPassword);
        assert_eq!(AuthError::from_code("auth/email-already-in-use"), AuthError::EmailExists);
        assert_eq!(AuthError::from_code("auth/popup-closed-by-user"), AuthError::PopupClosed);
    }

    #[test]
    fn test_auth_code_with_detail_suffix() {
        let err = AuthError::from_code("WEAK_PASSWORD : Password should be at least 6 characters");
        assert_eq!(err, AuthError::WeakPassword);
        assert_eq!(err.to_string(), "Password should be at least 6 characters.");
    }

    #[test]
    fn test_unknown_code_is_generic() {
        let err = AuthError::from_code("TOO_MANY_ATTEMPTS_TRY_LATER");
        assert_eq!(err.to_string(), "Something went wrong. Please try again.");
        assert_eq!(err, AuthError::Other("TOO_MANY_ATTEMPTS_TRY_LATER".into()));
    }

    #[test]
    fn test_only_provider_rejections_revoke_session() {
        assert!(AuthError::from_code("TOKEN_EXPIRED").revokes_session());
        assert!(AuthError::from_code("INVALID_REFRESH_TOKEN").revokes_session());
        assert!(AuthError::from_code("USER_DISABLED").revokes_session());
        assert!(!AuthError::Network.revokes_session());
        assert!(!AuthError::from_code("HTTP_503").revokes_session());
        assert!(!AuthError::Other("INVALID_RESPONSE".into()).revokes_session());
    }

    #[test]
    fn test_download_messages() {
        assert_eq!(DownloadError::NotReady.to_string(), "No downloadable file on this project yet.");
        assert!(DownloadError::Unavailable.to_string().contains("Try again shortly"));
    }
}
