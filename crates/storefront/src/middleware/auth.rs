//! Authentication extractors.
//!
//! Read the signed-in identity that `services::auth::AuthSession` keeps in
//! the session.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// Page requests without one are redirected to the sign-in page, which sends
/// the visitor back to the original path afterwards.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection for [`RequireAuth`].
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the sign-in page, then back to `return_to`.
    RedirectToSignIn { return_to: String },
    /// Session layer missing.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToSignIn { return_to } => {
                Redirect::to(&sign_in_url(&return_to)).into_response()
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Sign-in page URL that returns to `path` afterwards.
#[must_use]
pub fn sign_in_url(path: &str) -> String {
    if path == "/" {
        "/auth".to_string()
    } else {
        format!("/auth?redirect={path}")
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AuthRejection::RedirectToSignIn {
                return_to: return_path(parts),
            })?;

        Ok(Self(user))
    }
}

/// Path to come back to after signing in. Form posts return to the page the
/// form lives on, so a review post goes back to its product page.
fn return_path(parts: &Parts) -> String {
    let path = parts.uri.path();
    if parts.method == axum::http::Method::GET {
        return path.to_string();
    }
    path.strip_suffix("/reviews").unwrap_or(path).to_string()
}

/// Accept a post-sign-in redirect target only if it stays on this site.
#[must_use]
pub fn safe_redirect(target: Option<&str>) -> String {
    match target {
        Some(path) if is_local_path(path) => path.to_string(),
        _ => "/".to_string(),
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/checkout")), "/checkout");
        assert_eq!(safe_redirect(Some("/product/1?x=2")), "/product/1?x=2");
        assert_eq!(safe_redirect(None), "/");
        assert_eq!(safe_redirect(Some("https://evil.example")), "/");
        assert_eq!(safe_redirect(Some("//evil.example")), "/");
        assert_eq!(safe_redirect(Some("/\\evil.example")), "/");
        assert_eq!(safe_redirect(Some("")), "/");
    }

    #[test]
    fn test_sign_in_url() {
        assert_eq!(sign_in_url("/checkout"), "/auth?redirect=/checkout");
        assert_eq!(sign_in_url("/"), "/auth");
    }

    #[test]
    fn test_return_path_for_review_post() {
        let (parts, ()) = axum::http::Request::builder()
            .method("POST")
            .uri("/product/7/reviews")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(return_path(&parts), "/product/7");
    }
}
