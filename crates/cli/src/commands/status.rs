//! Check store connectivity and report the catalog size.
//!
//! Resolves the same readiness gate the storefront uses, so a green status
//! here means the storefront's first page load will work too.

use tracing::info;

use megastore_storefront::config::StorefrontConfig;
use megastore_storefront::firestore::StoreGateway;
use megastore_storefront::firestore::types::ProductSelection;

/// Run the connectivity check.
///
/// # Errors
///
/// Returns an error if configuration is missing, the connection cannot be
/// established, or the catalog query fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = StorefrontConfig::from_env()?;

    let gateway = StoreGateway::new(config.firestore.clone());
    let client = gateway.client().await?;
    info!("Store connection established");

    let products = client.query_products(&ProductSelection::default()).await?;
    info!(count = products.len(), "Catalog reachable");

    Ok(())
}
