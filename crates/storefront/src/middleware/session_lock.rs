//! Per-session request serialization.
//!
//! tower-sessions loads the session record lazily during a request and writes
//! the whole record back once the response is ready. Two overlapping requests
//! from the same browser would each read the same cart and the later save
//! would drop the earlier change. This layer sits outside the session layer
//! and holds a lock keyed by the session cookie for the full request, so the
//! load, the change and the save of one request finish before the next
//! request for that session starts.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::COOKIE},
    middleware::Next,
    response::Response,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_sessions::cookie::Cookie;

use super::session::SESSION_COOKIE_NAME;

/// Map size at which released locks are swept out.
const PRUNE_THRESHOLD: usize = 1024;

/// Paths that never touch the session.
const UNLOCKED_PREFIXES: [&str; 2] = ["/static/", "/health"];

/// Locks keyed by session cookie value.
///
/// Entries are weak: a lock lives only while a request holds or waits on it.
#[derive(Clone, Debug, Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<HashMap<String, Weak<Mutex<()>>>>>,
}

impl SessionLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a session.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= PRUNE_THRESHOLD {
                locks.retain(|_, lock| lock.strong_count() > 0);
            }
            if let Some(lock) = locks.get(session_id).and_then(Weak::upgrade) {
                lock
            } else {
                let lock = Arc::new(Mutex::new(()));
                locks.insert(session_id.to_string(), Arc::downgrade(&lock));
                lock
            }
        };
        lock.lock_owned().await
    }

    /// Number of sessions with a request in flight.
    pub async fn active(&self) -> usize {
        self.locks
            .lock()
            .await
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }
}

/// Read the session cookie value from the request headers.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Middleware that runs requests for the same session one at a time.
///
/// Requests without a session cookie start a fresh session and need no lock.
pub async fn session_lock_middleware(
    State(locks): State<SessionLocks>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if UNLOCKED_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return next.run(request).await;
    }
    let Some(session_id) = session_cookie(request.headers()) else {
        return next.run(request).await;
    };

    let _guard = locks.acquire(&session_id).await;
    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::time::Duration;

    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_same_session_waits_for_holder() {
        let locks = SessionLocks::new();
        let held = locks.acquire("abc").await;

        let waiting = tokio::time::timeout(Duration::from_millis(50), locks.acquire("abc")).await;
        assert!(waiting.is_err());

        drop(held);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire("abc")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_other_sessions_do_not_wait() {
        let locks = SessionLocks::new();
        let _held = locks.acquire("abc").await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire("xyz")).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_not_active() {
        let locks = SessionLocks::new();
        let held = locks.acquire("abc").await;
        assert_eq!(locks.active().await, 1);

        drop(held);
        assert_eq!(locks.active().await, 0);
    }

    #[test]
    fn test_session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; bd_session=s3ss10n; lang=en"),
        );
        assert_eq!(session_cookie(&headers).as_deref(), Some("s3ss10n"));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_cookie(&headers), None);
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }
}
