//! Authentication service.
//!
//! Credentials are checked by the hosted auth backend; this module validates
//! form input, talks to the backend through [`AuthBackend`], and keeps the
//! resulting identity and access token in the visitor's session.

mod error;

pub use error::AuthError;

use std::future::Future;

use secrecy::{ExposeSecret, SecretString};
use tower_sessions::Session;

use bhuvidevo_core::{Email, UserId};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::remote::{AuthTokens, RemoteClient, RemoteUser, SignUpResponse};

/// Minimum password length accepted on sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A successful credential exchange.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: CurrentUser,
    pub access_token: SecretString,
}

/// Result of registering with the backend.
#[derive(Debug, Clone)]
pub enum Registration {
    /// Account is usable immediately.
    Active(SignedIn),
    /// Account must be confirmed from the e-mail the backend sent.
    PendingConfirmation,
}

/// User record returned for an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendUser {
    pub id: UserId,
    pub email: Option<Email>,
}

/// Credential operations offered by an auth backend.
pub trait AuthBackend: Send + Sync {
    fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<SignedIn, AuthError>> + Send;

    fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<Registration, AuthError>> + Send;

    fn sign_out(&self, access_token: &str) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn current_user(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<BackendUser, AuthError>> + Send;
}

impl AuthBackend for RemoteClient {
    async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<SignedIn, AuthError> {
        let tokens = self.sign_in_with_password(email.as_str(), password).await?;
        Ok(signed_in(tokens, email))
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Registration, AuthError> {
        match self.sign_up_with_password(email.as_str(), password).await? {
            SignUpResponse::Session(tokens) => Ok(Registration::Active(signed_in(tokens, email))),
            SignUpResponse::PendingConfirmation(_) => Ok(Registration::PendingConfirmation),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.logout(access_token).await.map_err(AuthError::from)
    }

    async fn current_user(&self, access_token: &str) -> Result<BackendUser, AuthError> {
        let RemoteUser { id, email } = self.get_user(access_token).await?;
        Ok(BackendUser {
            id,
            email: email.and_then(|e| Email::parse(&e).ok()),
        })
    }
}

fn signed_in(tokens: AuthTokens, submitted: &Email) -> SignedIn {
    let email = tokens
        .user
        .email
        .as_deref()
        .and_then(|e| Email::parse(e).ok())
        .unwrap_or_else(|| submitted.clone());

    SignedIn {
        user: CurrentUser {
            id: tokens.user.id,
            email,
        },
        access_token: SecretString::from(tokens.access_token),
    }
}

/// Outcome of a sign-up form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Signed in as the new user.
    Active(CurrentUser),
    /// Nobody is signed in until the address is confirmed.
    PendingConfirmation(Email),
}

/// The signed-in identity of one browser session.
///
/// Holds no state of its own: the identity and the backend access token live
/// in the session, so every handler sees the same answer.
pub struct AuthSession<'a, B> {
    backend: Option<&'a B>,
    session: &'a Session,
}

impl<'a, B: AuthBackend> AuthSession<'a, B> {
    /// `backend` is `None` when no auth service is configured; every
    /// credential operation then fails with [`AuthError::Unavailable`].
    #[must_use]
    pub const fn new(backend: Option<&'a B>, session: &'a Session) -> Self {
        Self { backend, session }
    }

    fn backend(&self) -> Result<&'a B, AuthError> {
        self.backend.ok_or(AuthError::Unavailable)
    }

    /// Sign in with an e-mail and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` before contacting the backend if the
    /// address is malformed, otherwise the backend's rejection reason. The
    /// session is unchanged on error.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let signed_in = self.backend()?.sign_in(&email, password).await?;
        self.establish(signed_in).await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::PasswordMismatch` or
    /// `AuthError::WeakPassword` for bad form input, otherwise the backend's
    /// rejection reason.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        confirm_password: &SecretString,
    ) -> Result<SignUpOutcome, AuthError> {
        let email = Email::parse(email)?;
        validate_new_password(password, confirm_password)?;

        match self.backend()?.sign_up(&email, password).await? {
            Registration::Active(signed_in) => {
                Ok(SignUpOutcome::Active(self.establish(signed_in).await?))
            }
            Registration::PendingConfirmation => {
                tracing::info!("Sign-up awaiting email confirmation");
                Ok(SignUpOutcome::PendingConfirmation(email))
            }
        }
    }

    /// Forget the signed-in identity.
    ///
    /// The local identity is always cleared; revoking the token at the
    /// backend is attempted afterwards and its failure only logged. The cart
    /// survives sign-out.
    pub async fn sign_out(&self) {
        let token: Option<String> = self
            .session
            .get(session_keys::ACCESS_TOKEN)
            .await
            .ok()
            .flatten();

        if let Err(e) = self.clear().await {
            tracing::warn!(error = %e, "Failed to clear auth state from session");
        }
        clear_sentry_user();

        if let (Some(backend), Some(token)) = (self.backend, token)
            && let Err(e) = backend.sign_out(&token).await
        {
            tracing::warn!(error = %e, "Backend sign-out failed, local session cleared anyway");
        }
    }

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Option<CurrentUser> {
        self.session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
    }

    /// Access token of the signed-in user, for writes made on their behalf.
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .get::<String>(session_keys::ACCESS_TOKEN)
            .await
            .ok()
            .flatten()
    }

    /// Re-validate the stored token with the backend.
    ///
    /// A rejected token signs the visitor out; an unreachable backend keeps
    /// the current identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store fails.
    pub async fn refresh(&self) -> Result<Option<CurrentUser>, AuthError> {
        let Some(user) = self.current_user().await else {
            return Ok(None);
        };
        let Some(token) = self.access_token().await else {
            self.clear().await?;
            return Ok(None);
        };
        let Some(backend) = self.backend else {
            return Ok(Some(user));
        };

        match backend.current_user(&token).await {
            Ok(remote) => {
                let refreshed = CurrentUser {
                    id: remote.id,
                    email: remote.email.unwrap_or_else(|| user.email.clone()),
                };
                if refreshed != user {
                    self.session
                        .insert(session_keys::CURRENT_USER, &refreshed)
                        .await?;
                }
                Ok(Some(refreshed))
            }
            Err(
                e @ (AuthError::SessionExpired
                | AuthError::UserNotFound
                | AuthError::InvalidCredentials),
            ) => {
                tracing::info!(error = %e, "Stored session rejected, signing out");
                self.clear().await?;
                clear_sentry_user();
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not re-validate session, keeping it");
                Ok(Some(user))
            }
        }
    }

    async fn establish(&self, signed_in: SignedIn) -> Result<CurrentUser, AuthError> {
        // New identity, new session ID
        self.session.cycle_id().await?;
        self.session
            .insert(session_keys::CURRENT_USER, &signed_in.user)
            .await?;
        self.session
            .insert(
                session_keys::ACCESS_TOKEN,
                signed_in.access_token.expose_secret(),
            )
            .await?;

        set_sentry_user(&signed_in.user.id, Some(signed_in.user.email.as_str()));
        tracing::info!(user_id = %signed_in.user.id, "User signed in");
        Ok(signed_in.user)
    }

    async fn clear(&self) -> Result<(), tower_sessions::session::Error> {
        self.session
            .remove::<CurrentUser>(session_keys::CURRENT_USER)
            .await?;
        self.session
            .remove::<String>(session_keys::ACCESS_TOKEN)
            .await?;
        Ok(())
    }
}

/// Check a new password against its confirmation and the length rule.
///
/// # Errors
///
/// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword`.
pub fn validate_new_password(
    password: &SecretString,
    confirm_password: &SecretString,
) -> Result<(), AuthError> {
    let password = password.expose_secret();
    if password != confirm_password.expose_secret() {
        return Err(AuthError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tower_sessions::MemoryStore;

    use super::*;

    /// Scripted backend: each operation answers with a preset result.
    #[derive(Default)]
    struct FakeBackend {
        sign_up_pending: bool,
        reject_password: bool,
        sign_out_fails: bool,
        user_lookup: Mutex<Option<Result<BackendUser, AuthError>>>,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn user(email: &Email) -> SignedIn {
            SignedIn {
                user: CurrentUser {
                    id: UserId::new("user-1"),
                    email: email.clone(),
                },
                access_token: SecretString::from("token-1"),
            }
        }
    }

    impl AuthBackend for FakeBackend {
        async fn sign_in(
            &self,
            email: &Email,
            _password: &SecretString,
        ) -> Result<SignedIn, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject_password {
                return Err(AuthError::InvalidCredentials);
            }
            Ok(Self::user(email))
        }

        async fn sign_up(
            &self,
            email: &Email,
            _password: &SecretString,
        ) -> Result<Registration, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.sign_up_pending {
                Ok(Registration::PendingConfirmation)
            } else {
                Ok(Registration::Active(Self::user(email)))
            }
        }

        async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.sign_out_fails {
                return Err(AuthError::Network("connection refused".to_string()));
            }
            Ok(())
        }

        async fn current_user(&self, _access_token: &str) -> Result<BackendUser, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.user_lookup
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(AuthError::SessionExpired))
        }
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[tokio::test]
    async fn test_sign_in_sets_current_user_and_token() {
        let backend = FakeBackend::default();
        let session = session();
        let auth = AuthSession::new(Some(&backend), &session);

        let user = auth
            .sign_in(" Bhuvi@Example.com ", &secret("hunter22"))
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "bhuvi@example.com");
        assert_eq!(auth.current_user().await, Some(user));
        assert_eq!(auth.access_token().await.as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn test_sign_in_rejected_leaves_user_absent() {
        let backend = FakeBackend {
            reject_password: true,
            ..FakeBackend::default()
        };
        let session = session();
        let auth = AuthSession::new(Some(&backend), &session);

        let err = auth
            .sign_in("a@b.co", &secret("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(auth.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_email_never_reaches_backend() {
        let backend = FakeBackend::default();
        let session = session();
        let auth = AuthSession::new(Some(&backend), &session);

        let err = auth.sign_in("not-an-email", &secret("x")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_up_validates_passwords_locally() {
        let backend = FakeBackend::default();
        let session = session();
        let auth = AuthSession::new(Some(&backend), &session);

        let err = auth
            .sign_up("a@b.co", &secret("secret1"), &secret("secret2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordMismatch));

        let err = auth
            .sign_up("a@b.co", &secret("abc"), &secret("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_up_pending_confirmation_keeps_user_absent() {
        let backend = FakeBackend {
            sign_up_pending: true,
            ..FakeBackend::default()
        };
        let session = session();
        let auth = AuthSession::new(Some(&backend), &session);

        let outcome = auth
            .sign_up("new@b.co", &secret("secret1"), &secret("secret1"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SignUpOutcome::PendingConfirmation(Email::parse("new@b.co").unwrap())
        );
        assert!(auth.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_active_signs_in() {
        let backend = FakeBackend::default();
        let session = session();
        let auth = AuthSession::new(Some(&backend), &session);

        let outcome = auth
            .sign_up("new@b.co", &secret("secret1"), &secret("secret1"))
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::Active(_)));
        assert!(auth.current_user().await.is_some());
    }

    #[tokio::test]
    async fn test_sign_out_clears_user_even_when_backend_fails() {
        let backend = FakeBackend {
            sign_out_fails: true,
            ..FakeBackend::default()
        };
        let session = session();
        session.insert(session_keys::CART, "kept").await.unwrap();
        let auth = AuthSession::new(Some(&backend), &session);
        auth.sign_in("a@b.co", &secret("hunter22")).await.unwrap();

        auth.sign_out().await;

        assert!(auth.current_user().await.is_none());
        assert!(auth.access_token().await.is_none());
        let cart: Option<String> = session.get(session_keys::CART).await.unwrap();
        assert_eq!(cart.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_refresh_rejected_token_signs_out() {
        let backend = FakeBackend::default();
        let session = session();
        let auth = AuthSession::new(Some(&backend), &session);
        auth.sign_in("a@b.co", &secret("hunter22")).await.unwrap();

        assert!(auth.refresh().await.unwrap().is_none());
        assert!(auth.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_network_failure_keeps_user() {
        let backend = FakeBackend::default();
        *backend.user_lookup.lock().unwrap() =
            Some(Err(AuthError::Network("timed out".to_string())));
        let session = session();
        let auth = AuthSession::new(Some(&backend), &session);
        let user = auth.sign_in("a@b.co", &secret("hunter22")).await.unwrap();

        assert_eq!(auth.refresh().await.unwrap(), Some(user.clone()));
        assert_eq!(auth.current_user().await, Some(user));
    }

    #[tokio::test]
    async fn test_refresh_updates_email_from_backend() {
        let backend = FakeBackend::default();
        *backend.user_lookup.lock().unwrap() = Some(Ok(BackendUser {
            id: UserId::new("user-1"),
            email: Some(Email::parse("changed@b.co").unwrap()),
        }));
        let session = session();
        let auth = AuthSession::new(Some(&backend), &session);
        auth.sign_in("a@b.co", &secret("hunter22")).await.unwrap();

        let refreshed = auth.refresh().await.unwrap().unwrap();
        assert_eq!(refreshed.email.as_str(), "changed@b.co");
        assert_eq!(auth.current_user().await, Some(refreshed));
    }

    #[tokio::test]
    async fn test_without_backend_everything_is_unavailable() {
        let session = session();
        let auth: AuthSession<'_, FakeBackend> = AuthSession::new(None, &session);

        let err = auth.sign_in("a@b.co", &secret("pw")).await.unwrap_err();
        assert!(matches!(err, AuthError::Unavailable));
        auth.sign_out().await;
        assert!(auth.current_user().await.is_none());
    }
}
