//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::db::DocumentStore;
use crate::services::FallbackGuard;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the document store and the fallback guard built from configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn DocumentStore>,
    guard: FallbackGuard,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Service configuration
    /// * `store` - Document store handle, already connected
    #[must_use]
    pub fn new(config: &ServiceConfig, store: Arc<dyn DocumentStore>) -> Self {
        let guard = FallbackGuard::new(config.store.timeout);

        Self {
            inner: Arc::new(AppStateInner {
                store,
                guard,
            }),
        }
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    /// The fallback guard applied to degraded reads.
    #[must_use]
    pub fn guard(&self) -> FallbackGuard {
        self.inner.guard
    }
}
