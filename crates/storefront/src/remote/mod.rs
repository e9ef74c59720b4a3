//! Client for the hosted backend (PostgREST tables + GoTrue auth).
//!
//! # Architecture
//!
//! - Plain `reqwest` JSON calls, one method per query the storefront makes
//! - The backend is the source of truth: no local sync, no response caching
//! - Every request carries `apikey: <anon key>`; row writes and user lookups
//!   authenticate with the signed-in user's access token instead of the anon
//!   key in `Authorization: Bearer`
//!
//! # Example
//!
//! ```rust,ignore
//! use bhuvidevo_storefront::remote::{ProductQuery, RemoteClient};
//!
//! let client = RemoteClient::new(&config.remote.unwrap())?;
//! let products = client.list_products(&ProductQuery::new().category("Electronics")).await?;
//! ```

mod auth;
pub mod query;
pub mod types;

pub use auth::{AuthTokens, RemoteUser, SignUpResponse};
pub use query::{ProductQuery, ProductSort};
pub use types::*;

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use bhuvidevo_core::ProductId;

use crate::config::RemoteConfig;

/// Number of reviews shown on a product page.
pub const REVIEW_PAGE_SIZE: u32 = 10;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Status {
        status: u16,
        /// Machine-readable error code (`invalid_credentials`, `PGRST116`, ...).
        code: Option<String>,
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Requested row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl RemoteError {
    /// Machine-readable error code reported by the backend, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status reported by the backend, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Whether the request never got a usable answer (connection or timeout).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

/// Error payloads from PostgREST (`message`, `code`) and GoTrue (`msg`,
/// `error_code`, or the OAuth-style `error` + `error_description`).
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    error_code: Option<String>,
    code: Option<serde_json::Value>,
}

fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let code = parsed
        .error_code
        .or_else(|| {
            parsed
                .error_description
                .as_ref()
                .and(parsed.error.clone())
        })
        .or_else(|| {
            parsed
                .code
                .as_ref()
                .and_then(|c| c.as_str().map(str::to_owned))
        });

    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    RemoteError::Status {
        status: status.as_u16(),
        code,
        message,
    }
}

// =============================================================================
// RemoteClient
// =============================================================================

/// Client for the hosted backend.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct RemoteClient {
    inner: Arc<RemoteClientInner>,
}

struct RemoteClientInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(RemoteClientInner {
                client,
                base_url: config.url.as_str().trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
            }),
        })
    }

    /// Host name of the backend, used to allow its images in the CSP.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.inner.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let bearer = token.unwrap_or_else(|| self.inner.anon_key.expose_secret());
        self.inner
            .client
            .request(method, format!("{}/{path}", self.inner.base_url))
            .header("apikey", self.inner.anon_key.expose_secret())
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }

    fn table(&self, method: Method, table: &str, token: Option<&str>) -> RequestBuilder {
        self.request(method, &format!("rest/v1/{table}"), token)
    }

    /// Send a request and return the body of a successful response.
    async fn send(request: RequestBuilder) -> Result<String, RemoteError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(RemoteError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(status_error(status, &body));
        }

        Ok(body)
    }

    /// Send a request and decode the JSON body.
    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RemoteError> {
        let body = Self::send(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            RemoteError::Parse(e)
        })
    }

    /// Insert rows and return the stored representation.
    async fn insert<B, T>(&self, table: &str, token: &str, rows: &B) -> Result<Vec<T>, RemoteError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .table(Method::POST, table, Some(token))
            .header("Prefer", "return=representation")
            .json(rows);
        Self::execute(request).await
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List products matching a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RemoteError> {
        let request = self
            .table(Method::GET, "products", None)
            .query(&query.to_params());
        Self::execute(request).await
    }

    /// Get a single product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotFound` if no row matches, or an error if the
    /// API request fails.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, RemoteError> {
        let request = self.table(Method::GET, "products", None).query(&[
            ("select", "*".to_string()),
            ("id", format!("eq.{id}")),
            ("limit", "1".to_string()),
        ]);

        let rows: Vec<Product> = Self::execute(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound(format!("Product not found: {id}")))
    }

    // =========================================================================
    // Review Methods
    // =========================================================================

    /// Latest reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_reviews(&self, product_id: &ProductId) -> Result<Vec<Review>, RemoteError> {
        let request = self.table(Method::GET, "reviews", None).query(&[
            ("select", "*".to_string()),
            ("product_id", format!("eq.{product_id}")),
            ("order", "created_at.desc".to_string()),
            ("limit", REVIEW_PAGE_SIZE.to_string()),
        ]);
        Self::execute(request).await
    }

    /// Store a review written by the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the backend rejects the row.
    #[instrument(skip(self, access_token, review), fields(product_id = %review.product_id))]
    pub async fn insert_review(
        &self,
        access_token: &str,
        review: &NewReview,
    ) -> Result<Review, RemoteError> {
        let rows: Vec<Review> = self
            .insert("reviews", access_token, std::slice::from_ref(review))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound("Inserted review not returned".to_string()))
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Create an order header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the backend rejects the row.
    #[instrument(skip(self, access_token, order), fields(user_id = %order.user_id))]
    pub async fn insert_order(
        &self,
        access_token: &str,
        order: &NewOrder,
    ) -> Result<Order, RemoteError> {
        let rows: Vec<Order> = self
            .insert("orders", access_token, std::slice::from_ref(order))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound("Inserted order not returned".to_string()))
    }

    /// Create the line rows of an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the backend rejects the rows.
    #[instrument(skip(self, access_token, items), fields(count = items.len()))]
    pub async fn insert_order_items(
        &self,
        access_token: &str,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, RemoteError> {
        self.insert("order_items", access_token, items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");
    }

    #[test]
    fn test_status_error_gotrue_body() {
        let body = r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        let err = status_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code(), Some("invalid_credentials"));
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            err.to_string(),
            "Backend returned 400: Invalid login credentials"
        );
    }

    #[test]
    fn test_status_error_oauth_style_body() {
        let body = r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#;
        let err = status_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code(), Some("invalid_grant"));
        assert!(err.to_string().ends_with("Email not confirmed"));
    }

    #[test]
    fn test_status_error_postgrest_body() {
        let body = r#"{"code":"22P02","details":null,"hint":null,"message":"invalid input syntax for type uuid"}"#;
        let err = status_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code(), Some("22P02"));
        assert!(err.to_string().contains("invalid input syntax"));
    }

    #[test]
    fn test_status_error_unparseable_body() {
        let err = status_error(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Backend returned 502: Bad Gateway");
        assert!(!err.is_transport());
    }
}
