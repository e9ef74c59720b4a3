//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CSP nonce (generate per-request nonce for inline scripts)
//! 5. Security headers (CSP, frame and isolation policies)
//! 6. Session lock (one request at a time per session cookie)
//! 7. Session layer (tower-sessions with in-memory store)
//! 8. Rate limiting on credential and form posts (governor)

pub mod auth;
pub mod csp;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod session_lock;

pub use auth::{RequireAuth, safe_redirect, sign_in_url};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use rate_limit::{auth_rate_limiter, form_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::{ContentPolicy, security_headers_middleware};
pub use session::create_session_layer;
pub use session_lock::{SessionLocks, session_lock_middleware};
