//! Authentication error types.

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bhuvidevo_core::EmailError),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Account exists but the e-mail address was never confirmed.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Sign-up password and confirmation differ.
    #[error("passwords don't match")]
    PasswordMismatch,

    /// Stored access token was rejected by the backend.
    #[error("session expired")]
    SessionExpired,

    /// No auth backend is configured.
    #[error("authentication is not configured")]
    Unavailable,

    /// The backend could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Remote(RemoteError),

    /// Session store failure.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Message safe to show on the sign-in page.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::InvalidCredentials | Self::UserNotFound => {
                "Invalid email or password".to_string()
            }
            Self::EmailNotConfirmed => {
                "Please confirm your email address before signing in".to_string()
            }
            Self::UserAlreadyExists => "An account with this email already exists".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::PasswordMismatch => "Passwords don't match".to_string(),
            Self::SessionExpired => "Your session has expired, please sign in again".to_string(),
            Self::Unavailable => "Accounts are not available right now".to_string(),
            Self::Network(_) => "Could not reach the server, please try again".to_string(),
            Self::Remote(_) | Self::Session(_) => "Authentication error".to_string(),
        }
    }
}

impl From<RemoteError> for AuthError {
    fn from(err: RemoteError) -> Self {
        if err.is_transport() {
            return Self::Network(err.to_string());
        }

        let message = match &err {
            RemoteError::Status { message, .. } => message.to_lowercase(),
            _ => String::new(),
        };

        let code = err.code().map(str::to_owned);
        match code.as_deref() {
            Some("invalid_credentials") => Self::InvalidCredentials,
            Some("email_not_confirmed") => Self::EmailNotConfirmed,
            Some("invalid_grant") if message.contains("not confirmed") => Self::EmailNotConfirmed,
            Some("invalid_grant") => Self::InvalidCredentials,
            Some("user_already_exists" | "email_exists") => Self::UserAlreadyExists,
            Some("user_not_found") => Self::UserNotFound,
            Some("weak_password") => match err {
                RemoteError::Status { message, .. } => Self::WeakPassword(message),
                other => Self::Remote(other),
            },
            Some("bad_jwt" | "session_not_found" | "session_expired") => Self::SessionExpired,
            _ if message.contains("already registered") => Self::UserAlreadyExists,
            _ if matches!(err.status(), Some(401 | 403)) => Self::SessionExpired,
            _ => Self::Remote(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, code: Option<&str>, message: &str) -> RemoteError {
        RemoteError::Status {
            status,
            code: code.map(str::to_owned),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_maps_backend_codes() {
        assert!(matches!(
            AuthError::from(status(400, Some("invalid_credentials"), "Invalid login credentials")),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            AuthError::from(status(400, Some("invalid_grant"), "Email not confirmed")),
            AuthError::EmailNotConfirmed
        ));
        assert!(matches!(
            AuthError::from(status(422, None, "User already registered")),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            AuthError::from(status(401, None, "invalid JWT")),
            AuthError::SessionExpired
        ));
        assert!(matches!(
            AuthError::from(status(500, None, "boom")),
            AuthError::Remote(_)
        ));
    }

    #[test]
    fn test_weak_password_keeps_backend_message() {
        let err = AuthError::from(status(
            422,
            Some("weak_password"),
            "Password should be at least 6 characters.",
        ));
        assert_eq!(err.user_message(), "Password should be at least 6 characters.");
    }
}
