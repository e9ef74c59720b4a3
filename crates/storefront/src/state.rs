//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::middleware::{ContentPolicy, SessionLocks};
use crate::remote::{RemoteClient, RemoteError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The backend client is absent
/// when no backend is configured; the catalog then serves placeholder
/// products and account features report themselves unavailable.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    remote: Option<RemoteClient>,
    catalog: Catalog,
    content_policy: ContentPolicy,
    session_locks: SessionLocks,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, RemoteError> {
        let remote = config.remote.as_ref().map(RemoteClient::new).transpose()?;
        let content_policy = ContentPolicy::new(remote.iter().filter_map(RemoteClient::host));
        let catalog = Catalog::new(remote.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                remote,
                catalog,
                content_policy,
                session_locks: SessionLocks::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the backend client, if one is configured.
    #[must_use]
    pub fn remote(&self) -> Option<&RemoteClient> {
        self.inner.remote.as_ref()
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get the Content Security Policy settings.
    #[must_use]
    pub fn content_policy(&self) -> &ContentPolicy {
        &self.inner.content_policy
    }

    /// Get the per-session request locks.
    #[must_use]
    pub fn session_locks(&self) -> &SessionLocks {
        &self.inner.session_locks
    }
}
