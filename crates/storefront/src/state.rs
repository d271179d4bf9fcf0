//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::firestore::StoreGateway;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store gateway and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: StoreGateway,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The store gateway is created lazily connected: no network traffic
    /// happens here, only on the first `store().client()` await.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let store = StoreGateway::new(config.firestore.clone());

        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the document store gateway.
    #[must_use]
    pub fn store(&self) -> &StoreGateway {
        &self.inner.store
    }
}
