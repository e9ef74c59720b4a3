//! GoTrue auth endpoints.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bhuvidevo_core::UserId;

use super::{RemoteClient, RemoteError};

/// A user record as returned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued on sign-in (and on sign-up when confirmation is off).
#[derive(Debug, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub user: RemoteUser,
}

/// Sign-up answers with a session when e-mail confirmation is disabled for
/// the project, and with the bare (unconfirmed) user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(AuthTokens),
    PendingConfirmation(RemoteUser),
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

impl RemoteClient {
    /// Exchange an e-mail and password for tokens.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Status` with the backend's reason when the
    /// credentials are rejected, or an error if the request fails.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthTokens, RemoteError> {
        let request = self
            .request(Method::POST, "auth/v1/token", None)
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials {
                email,
                password: password.expose_secret(),
            });
        Self::execute(request).await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Status` when the backend rejects the account
    /// (already registered, weak password), or an error if the request fails.
    #[instrument(skip(self, password))]
    pub async fn sign_up_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpResponse, RemoteError> {
        let request = self
            .request(Method::POST, "auth/v1/signup", None)
            .json(&PasswordCredentials {
                email,
                password: password.expose_secret(),
            });
        Self::execute(request).await
    }

    /// Revoke the session behind an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip_all)]
    pub async fn logout(&self, access_token: &str) -> Result<(), RemoteError> {
        let request = self.request(Method::POST, "auth/v1/logout", Some(access_token));
        Self::send(request).await.map(|_| ())
    }

    /// Look up the user that owns an access token.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Status` (401/403) for an expired or revoked
    /// token, or an error if the request fails.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<RemoteUser, RemoteError> {
        let request = self.request(Method::GET, "auth/v1/user", Some(access_token));
        Self::execute(request).await
    }
}
