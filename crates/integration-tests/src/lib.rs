//! Integration test helpers for the BhuviDevo storefront.
//!
//! The storefront router is driven in-process with `tower::ServiceExt::oneshot`.
//! The hosted backend is either absent (placeholder catalog) or stood in for
//! by a `wiremock` server.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bhuvidevo-integration-tests
//! ```
//!
//! No external services are needed.

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use secrecy::SecretString;
use tower::ServiceExt;

use bhuvidevo_storefront::config::{LogFormat, RemoteConfig, SentryConfig, StorefrontConfig};
use bhuvidevo_storefront::state::AppState;

/// Anonymous key the mocked backend expects.
pub const TEST_ANON_KEY: &str = "test-anon-key-0123456789";

/// Configuration for tests, optionally pointing at a mocked backend.
///
/// # Panics
///
/// Panics if `backend_url` is not a valid URL.
#[must_use]
pub fn test_config(backend_url: Option<&str>) -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../storefront/static")),
        remote: backend_url.map(|url| RemoteConfig {
            url: url.parse().expect("valid backend URL"),
            anon_key: SecretString::from(TEST_ANON_KEY),
            timeout: Duration::from_secs(5),
        }),
        log_format: LogFormat::Pretty,
        sentry: SentryConfig::default(),
    }
}

/// Build the full storefront router.
///
/// # Panics
///
/// Panics if the application state cannot be created.
#[must_use]
pub fn test_app(backend_url: Option<&str>) -> Router {
    let state = AppState::new(test_config(backend_url)).expect("app state");
    bhuvidevo_storefront::app(state)
}

/// A browser stand-in: sends requests through the router and carries the
/// session cookie between them.
///
/// Clones share the router and start with the same cookie, like tabs of one
/// browser.
#[derive(Clone)]
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
}

/// A buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// A response header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestClient {
    #[must_use]
    pub const fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    /// Storefront without a backend.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(test_app(None))
    }

    /// Storefront talking to the backend at `url`.
    #[must_use]
    pub fn with_backend(url: &str) -> Self {
        Self::new(test_app(Some(url)))
    }

    /// Whether a session cookie has been issued.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    /// Send a GET request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Request::get(path), Body::empty()).await
    }

    /// Send a form POST.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let builder = Request::post(path).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        self.send(builder, Body::from(body)).await
    }

    /// Send a form POST marked as coming from HTMX.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn post_htmx(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let builder = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("hx-request", "true");
        self.send(builder, Body::from(body)).await
    }

    async fn send(&mut self, mut builder: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(body).expect("request");
        let response = self.app.clone().oneshot(request).await.expect("infallible");
        self.remember_cookie(&response);
        buffer(response).await
    }

    fn remember_cookie(&mut self, response: &Response<Body>) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let Some(pair) = value.split(';').next() else { continue };
            if value.contains("Max-Age=0") {
                self.cookie = None;
            } else {
                self.cookie = Some(pair.trim().to_string());
            }
        }
    }
}

async fn buffer(response: Response<Body>) -> TestResponse {
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("response body");
    TestResponse {
        status: parts.status,
        headers: parts.headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// Percent-encode a form value.
fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
