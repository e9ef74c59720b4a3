//! Authentication route handlers.
//!
//! Sign-in and sign-up share one page with a mode switch. Credentials are
//! checked by the hosted auth backend; errors come back to the page as a
//! message in the query string.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use crate::filters;
use crate::middleware::{CspNonce, safe_redirect};
use crate::services::auth::{AuthError, AuthSession, SignUpOutcome};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    pub redirect: Option<String>,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub redirect: Option<String>,
}

// =============================================================================
// Query Types
// =============================================================================

/// Which form the auth page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

impl AuthMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::SignIn => "sign-in",
            Self::SignUp => "sign-up",
        }
    }
}

/// Query parameters of the auth page.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub mode: Option<String>,
    pub redirect: Option<String>,
    pub error: Option<String>,
}

impl AuthQuery {
    fn mode(&self) -> AuthMode {
        match self.mode.as_deref() {
            Some("sign-up") => AuthMode::SignUp,
            _ => AuthMode::SignIn,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Sign-in / sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/page.html")]
pub struct AuthPageTemplate {
    pub layout: Layout,
    pub sign_up: bool,
    pub redirect: String,
    pub error: Option<String>,
    pub available: bool,
}

/// Shown after a sign-up that must be confirmed by e-mail.
#[derive(Template, WebTemplate)]
#[template(path = "auth/confirm_email.html")]
pub struct ConfirmEmailTemplate {
    pub layout: Layout,
    pub email: String,
}

/// Back to the auth page in `mode`, showing `error`.
fn back_to_form(mode: AuthMode, redirect: &str, error: &AuthError) -> Redirect {
    let mut url = format!(
        "/auth?mode={}&error={}",
        mode.as_str(),
        urlencoding::encode(&error.user_message())
    );
    if redirect != "/" {
        url.push_str("&redirect=");
        url.push_str(&urlencoding::encode(redirect));
    }
    Redirect::to(&url)
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the sign-in / sign-up page.
///
/// Visitors who are already signed in go straight to the redirect target.
#[instrument(skip(state, session, nonce, query))]
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<AuthQuery>,
) -> Response {
    let redirect = safe_redirect(query.redirect.as_deref());
    let layout = Layout::load(&session, nonce).await;
    if layout.user.is_some() {
        return Redirect::to(&redirect).into_response();
    }

    AuthPageTemplate {
        layout,
        sign_up: query.mode() == AuthMode::SignUp,
        redirect,
        error: query.error,
        available: state.remote().is_some(),
    }
    .into_response()
}

/// Handle sign-in form submission.
#[instrument(skip(state, session, form))]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Redirect {
    let redirect = safe_redirect(form.redirect.as_deref());
    let password = SecretString::from(form.password);

    match AuthSession::new(state.remote(), &session)
        .sign_in(&form.email, &password)
        .await
    {
        Ok(_) => Redirect::to(&redirect),
        Err(e) => {
            tracing::warn!(error = %e, "Sign-in failed");
            back_to_form(AuthMode::SignIn, &redirect, &e)
        }
    }
}

/// Handle sign-up form submission.
///
/// An account that needs e-mail confirmation gets the confirmation notice
/// instead of a redirect; the visitor stays signed out until they confirm.
#[instrument(skip(state, session, nonce, form))]
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<SignUpForm>,
) -> Response {
    let redirect = safe_redirect(form.redirect.as_deref());
    let password = SecretString::from(form.password);
    let confirm_password = SecretString::from(form.confirm_password);

    match AuthSession::new(state.remote(), &session)
        .sign_up(&form.email, &password, &confirm_password)
        .await
    {
        Ok(SignUpOutcome::Active(_)) => Redirect::to(&redirect).into_response(),
        Ok(SignUpOutcome::PendingConfirmation(email)) => ConfirmEmailTemplate {
            layout: Layout::load(&session, nonce).await,
            email: email.to_string(),
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            back_to_form(AuthMode::SignUp, &redirect, &e).into_response()
        }
    }
}

/// Handle sign-out.
///
/// Always ends signed out, whatever the backend says.
#[instrument(skip(state, session))]
pub async fn sign_out(State(state): State<AppState>, session: Session) -> Redirect {
    AuthSession::new(state.remote(), &session).sign_out().await;
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        let query = AuthQuery {
            mode: Some("sign-up".to_string()),
            ..AuthQuery::default()
        };
        assert_eq!(query.mode(), AuthMode::SignUp);
        assert_eq!(AuthQuery::default().mode(), AuthMode::SignIn);
    }

    #[test]
    fn test_back_to_form_keeps_redirect() {
        let response = back_to_form(AuthMode::SignIn, "/checkout", &AuthError::InvalidCredentials)
            .into_response();
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(location.starts_with("/auth?mode=sign-in&error="));
        assert!(location.ends_with("&redirect=%2Fcheckout"));
    }
}
