//! Firestore document store client.
//!
//! # Architecture
//!
//! - Plain REST v1 (`runQuery`, document GET, `commit`) over `reqwest`
//! - The store is source of truth for products - NO local sync, direct reads
//! - In-memory caching via `moka` for product point lookups (5 minute TTL)
//! - All reads and writes go through the [`StoreGateway`] readiness gate:
//!   nothing talks to the store before the anonymous session is established
//!
//! # Collections
//!
//! - `products` - the sellable catalog, owned and mutated by the store side
//! - `carts/{guest_id}` - one mutable document per guest, updated with
//!   atomic field transforms (never read-modify-write on quantities)
//!
//! # Example
//!
//! ```rust,ignore
//! use megastore_storefront::firestore::StoreGateway;
//!
//! let gateway = StoreGateway::new(config.firestore.clone());
//!
//! // Await readiness, then query
//! let client = gateway.client().await?;
//! let products = client.query_products(&selection).await?;
//!
//! // Add two units of a product to a guest cart
//! let product = client.get_product(&product_id).await?;
//! client.add_to_cart(&guest_id, &product, 2).await?;
//! ```

mod client;
mod convert;
mod gateway;
pub mod types;
pub mod wire;

pub use client::FirestoreClient;
pub use gateway::StoreGateway;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store connection / anonymous session is not established.
    #[error("Store not ready: {0}")]
    NotReady(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned a non-success status.
    #[error("Store returned HTTP {code}: {message}")]
    Status { code: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A document failed validation at the store boundary.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Build a `Status` error from a REST error body, falling back to the
    /// raw body when it is not the standard error envelope.
    #[must_use]
    pub(crate) fn from_error_body(code: u16, body: &str) -> Self {
        let message = serde_json::from_str::<wire::ErrorBody>(body).map_or_else(
            |_| body.chars().take(200).collect::<String>(),
            |e| e.error.message,
        );
        Self::Status { code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound("products/p1".to_string());
        assert_eq!(err.to_string(), "Not found: products/p1");

        let err = StoreError::NotReady("sign-in failed".to_string());
        assert_eq!(err.to_string(), "Store not ready: sign-in failed");
    }

    #[test]
    fn test_status_error_from_error_envelope() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        let err = StoreError::from_error_body(403, body);
        assert_eq!(
            err.to_string(),
            "Store returned HTTP 403: Missing or insufficient permissions."
        );
    }

    #[test]
    fn test_status_error_from_opaque_body() {
        let err = StoreError::from_error_body(502, "upstream exploded");
        assert_eq!(err.to_string(), "Store returned HTTP 502: upstream exploded");
    }
}
