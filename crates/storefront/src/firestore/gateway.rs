//! One-shot readiness gate in front of the store connection.
//!
//! Dependent views must not issue queries until the store connection and
//! the anonymous session are established. The gate is a single awaited
//! initialization that resolves once; there is no polling and no event
//! listening. A failed initialization surfaces to the caller (a visible
//! error state) and the next caller re-attempts the connection once.

use tokio::sync::OnceCell;
use tracing::instrument;

use crate::config::FirestoreConfig;

use super::{FirestoreClient, StoreError};

/// Readiness gate owning the (eventual) store client.
pub struct StoreGateway {
    config: FirestoreConfig,
    client: OnceCell<FirestoreClient>,
}

impl StoreGateway {
    /// Create a gateway. No network traffic happens until the first
    /// [`client`](Self::client) await.
    #[must_use]
    pub const fn new(config: FirestoreConfig) -> Self {
        Self {
            config,
            client: OnceCell::const_new(),
        }
    }

    /// Await store readiness and get the connected client.
    ///
    /// The first caller performs the anonymous sign-in; every later caller
    /// gets the established client immediately.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotReady` if the connection cannot be
    /// established. The attempt is not cached: a subsequent call retries.
    #[instrument(skip(self))]
    pub async fn client(&self) -> Result<&FirestoreClient, StoreError> {
        self.client
            .get_or_try_init(|| async {
                tracing::info!(project_id = %self.config.project_id, "Connecting to document store");
                FirestoreClient::connect(&self.config)
                    .await
                    .map_err(|e| StoreError::NotReady(e.to_string()))
            })
            .await
    }

    /// Whether the readiness signal has already resolved.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.client.initialized()
    }
}
