//! Firestore REST client.
//!
//! One `reqwest` client per process, an anonymous bearer session that
//! refreshes itself before expiry, and a `moka` cache in front of product
//! point lookups (products are immutable from the storefront's side).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use megastore_core::{GuestId, ProductId};

use crate::config::FirestoreConfig;

use super::StoreError;
use super::convert::{cart_from_document, new_product_fields, product_from_document};
use super::types::{Cart, NewProduct, Product, ProductSelection, cart_document_id};
use super::wire::{
    CommitRequest, Document, DocumentMask, FieldTransform, RunQueryElement, RunQueryRequest,
    StructuredQuery, Value, Write, equality, field_path, membership,
};

/// Firestore REST endpoint.
const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Identity Toolkit endpoint used for anonymous sign-in.
const IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

/// Collection holding the catalog.
const PRODUCTS_COLLECTION: &str = "products";

/// Collection holding one document per guest cart.
const CARTS_COLLECTION: &str = "carts";

/// The store rejects `IN` predicates with more than 10 disjuncts.
pub const MAX_MEMBERSHIP_VALUES: usize = 10;

/// Refresh the bearer token this long before it actually expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

// =============================================================================
// FirestoreClient
// =============================================================================

/// Client for the Firestore document store.
///
/// Provides validated access to the `products` collection and per-guest
/// cart documents. Product point lookups are cached for 5 minutes.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<FirestoreClientInner>,
}

struct FirestoreClientInner {
    http: reqwest::Client,
    /// `projects/{p}/databases/{db}/documents` base URL.
    documents_base: String,
    api_key: SecretString,
    session: RwLock<AuthSession>,
    product_cache: Cache<String, Product>,
}

/// An established anonymous store session.
struct AuthSession {
    bearer: String,
    expires_at: Instant,
}

impl AuthSession {
    fn needs_refresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    id_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    local_id: String,
}

impl FirestoreClient {
    /// Establish the store connection: anonymous sign-in plus endpoint
    /// construction. This is the readiness gate's one-shot initialization;
    /// call it through [`super::StoreGateway`], not directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the anonymous sign-in fails.
    pub(super) async fn connect(config: &FirestoreConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::new();
        let session = sign_in_anonymously(&http, &config.api_key).await?;

        let product_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let documents_base = format!(
            "{FIRESTORE_ENDPOINT}/projects/{}/databases/{}/documents",
            config.project_id, config.database
        );

        Ok(Self {
            inner: Arc::new(FirestoreClientInner {
                http,
                documents_base,
                api_key: config.api_key.clone(),
                session: RwLock::new(session),
                product_cache,
            }),
        })
    }

    /// Current bearer token, re-establishing the anonymous session when it
    /// is about to expire.
    async fn bearer(&self) -> Result<String, StoreError> {
        {
            let session = self.inner.session.read().await;
            if !session.needs_refresh() {
                return Ok(session.bearer.clone());
            }
        }

        let mut session = self.inner.session.write().await;
        // Another task may have refreshed while we waited for the lock
        if session.needs_refresh() {
            debug!("Store session expiring, re-establishing");
            *session = sign_in_anonymously(&self.inner.http, &self.inner.api_key).await?;
        }
        Ok(session.bearer.clone())
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a product by its store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, `InvalidDocument` if the
    /// stored record fails validation, or a query-failure error otherwise.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product, StoreError> {
        let cache_key = format!("product:{product_id}");

        if let Some(product) = self.inner.product_cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let path = format!("{PRODUCTS_COLLECTION}/{product_id}");
        let doc = self.get_document(&path).await?;
        let product = product_from_document(&doc)?;

        self.inner
            .product_cache
            .insert(cache_key, product.clone())
            .await;

        Ok(product)
    }

    /// Query the catalog with server-side predicates.
    ///
    /// Documents failing validation are skipped with a warning rather than
    /// failing the whole page. Brand predicates beyond the store's `IN` cap
    /// are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the query request fails.
    #[instrument(skip(self))]
    pub async fn query_products(
        &self,
        selection: &ProductSelection,
    ) -> Result<Vec<Product>, StoreError> {
        let query = StructuredQuery::collection(PRODUCTS_COLLECTION)
            .with_predicates(selection_predicates(selection));

        let elements = self.run_query(query).await?;

        let mut products = Vec::with_capacity(elements.len());
        for element in elements {
            let Some(doc) = element.document else {
                continue;
            };
            match product_from_document(&doc) {
                Ok(product) => products.push(product),
                Err(e) => warn!(document = %doc.name, "Skipping invalid product document: {e}"),
            }
        }

        Ok(products)
    }

    /// Create a product document, letting the store assign the id.
    ///
    /// Used by seed tooling only; the storefront never writes products.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<ProductId, StoreError> {
        let url = format!("{}/{PRODUCTS_COLLECTION}", self.inner.documents_base);
        let body = Document {
            name: String::new(),
            fields: new_product_fields(product),
            create_time: None,
            update_time: None,
        };

        let bearer = self.bearer().await?;
        let response = self
            .inner
            .http
            .post(&url)
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;

        let doc: Document = read_json(response, &url).await?;
        Ok(ProductId::new(doc.document_id()))
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Get a guest's cart. A guest without a cart document has an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDocument` if the stored cart fails validation, or a
    /// query-failure error otherwise.
    #[instrument(skip(self), fields(guest = %guest))]
    pub async fn get_cart(&self, guest: &GuestId) -> Result<Cart, StoreError> {
        let path = format!("{CARTS_COLLECTION}/{}", cart_document_id(guest));
        match self.get_document(&path).await {
            Ok(doc) => cart_from_document(&doc),
            Err(StoreError::NotFound(_)) => Ok(Cart::empty()),
            Err(e) => Err(e),
        }
    }

    /// Add `quantity` units of a product to a guest's cart.
    ///
    /// The quantity lands as an atomic increment on the line keyed by the
    /// product id, so concurrent adds serialize in the store and a repeat
    /// add can never create a second line. Name, price and image are
    /// snapshotted alongside (last write wins on those).
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    #[instrument(skip(self, product), fields(guest = %guest, product_id = %product.id, quantity))]
    pub async fn add_to_cart(
        &self,
        guest: &GuestId,
        product: &Product,
        quantity: u32,
    ) -> Result<(), StoreError> {
        let write = add_line_write(&self.cart_document_name(guest), product, quantity);
        self.commit(vec![write]).await
    }

    /// Remove a line from a guest's cart entirely (delete-whole-line).
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    #[instrument(skip(self), fields(guest = %guest, product_id = %product_id))]
    pub async fn remove_from_cart(
        &self,
        guest: &GuestId,
        product_id: &ProductId,
    ) -> Result<(), StoreError> {
        let write = remove_line_write(&self.cart_document_name(guest), product_id);
        self.commit(vec![write]).await
    }

    fn cart_document_name(&self, guest: &GuestId) -> String {
        format!(
            "{}/{CARTS_COLLECTION}/{}",
            self.inner.documents_base,
            cart_document_id(guest)
        )
    }

    // =========================================================================
    // REST Plumbing
    // =========================================================================

    /// Point lookup of a document by collection-relative path.
    async fn get_document(&self, path: &str) -> Result<Document, StoreError> {
        let url = format!("{}/{path}", self.inner.documents_base);
        let bearer = self.bearer().await?;

        let response = self.inner.http.get(&url).bearer_auth(bearer).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(path.to_string()));
        }
        read_json(response, &url).await
    }

    /// Execute a structured query against the documents root.
    async fn run_query(&self, query: StructuredQuery) -> Result<Vec<RunQueryElement>, StoreError> {
        let url = format!("{}:runQuery", self.inner.documents_base);
        let bearer = self.bearer().await?;

        let response = self
            .inner
            .http
            .post(&url)
            .bearer_auth(bearer)
            .json(&RunQueryRequest {
                structured_query: query,
            })
            .send()
            .await?;

        read_json(response, &url).await
    }

    /// Commit writes atomically.
    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        let url = format!("{}:commit", self.inner.documents_base);
        let bearer = self.bearer().await?;

        let response = self
            .inner
            .http
            .post(&url)
            .bearer_auth(bearer)
            .json(&CommitRequest { writes })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        Err(StoreError::from_error_body(status.as_u16(), &body))
    }
}

/// Check the status and decode a JSON response body.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    url: &str,
) -> Result<T, StoreError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            status = %status,
            url = %url,
            body = %body.chars().take(500).collect::<String>(),
            "Store returned non-success status"
        );
        return Err(StoreError::from_error_body(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(StoreError::Parse)
}

/// Establish an anonymous session against the identity endpoint.
async fn sign_in_anonymously(
    http: &reqwest::Client,
    api_key: &SecretString,
) -> Result<AuthSession, StoreError> {
    let url = format!("{IDENTITY_ENDPOINT}/accounts:signUp");

    let response = http
        .post(&url)
        .query(&[("key", api_key.expose_secret())])
        .json(&serde_json::json!({ "returnSecureToken": true }))
        .send()
        .await?;

    let signup: SignUpResponse = read_json(response, &url).await?;

    let expires_in = signup
        .expires_in
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(3600);

    debug!(local_id = %signup.local_id, expires_in, "Anonymous store session established");

    Ok(AuthSession {
        bearer: signup.id_token,
        expires_at: Instant::now() + Duration::from_secs(expires_in),
    })
}

// =============================================================================
// Query & Write Plans (pure, unit-tested)
// =============================================================================

/// Server-side predicates for a catalog selection.
fn selection_predicates(selection: &ProductSelection) -> Vec<super::wire::Filter> {
    let mut predicates = Vec::new();

    if let Some(category) = &selection.category {
        predicates.push(equality("category", Value::string(category.clone())));
    }

    if !selection.brands.is_empty() {
        let mut brands = selection.brands.clone();
        if brands.len() > MAX_MEMBERSHIP_VALUES {
            warn!(
                selected = brands.len(),
                cap = MAX_MEMBERSHIP_VALUES,
                "Too many brand predicates for the store, dropping the excess"
            );
            brands.truncate(MAX_MEMBERSHIP_VALUES);
        }
        predicates.push(membership("brand", brands));
    }

    predicates
}

/// The write that adds `quantity` units of a product to a cart document.
///
/// Upserts the line's snapshot fields under `items.{id}` and increments its
/// quantity with an atomic transform; creates the cart document when the
/// guest has none.
fn add_line_write(cart_name: &str, product: &Product, quantity: u32) -> Write {
    let id = product.id.as_str();

    let mut snapshot = BTreeMap::new();
    snapshot.insert("name".to_string(), Value::string(product.name.clone()));
    snapshot.insert(
        "price".to_string(),
        Value::double(product.price.amount.to_f64().unwrap_or_default()),
    );
    if let Some(image) = &product.image_url {
        snapshot.insert("image".to_string(), Value::string(image.clone()));
    }

    let mut line = BTreeMap::new();
    line.insert(id.to_string(), Value::map(snapshot));
    let mut fields = BTreeMap::new();
    fields.insert("items".to_string(), Value::map(line));

    // Masking `image` even when absent deletes a stale snapshot image.
    let field_paths = vec![
        field_path(&["items", id, "name"]),
        field_path(&["items", id, "price"]),
        field_path(&["items", id, "image"]),
    ];

    Write {
        update: Some(Document {
            name: cart_name.to_string(),
            fields,
            create_time: None,
            update_time: None,
        }),
        update_mask: Some(DocumentMask { field_paths }),
        update_transforms: vec![
            FieldTransform::increment(field_path(&["items", id, "quantity"]), i64::from(quantity)),
            FieldTransform::request_time("updated_at"),
        ],
    }
}

/// The write that deletes a whole cart line (mask without a value).
fn remove_line_write(cart_name: &str, product_id: &ProductId) -> Write {
    Write {
        update: Some(Document {
            name: cart_name.to_string(),
            fields: BTreeMap::new(),
            create_time: None,
            update_time: None,
        }),
        update_mask: Some(DocumentMask {
            field_paths: vec![field_path(&["items", product_id.as_str()])],
        }),
        update_transforms: vec![FieldTransform::request_time("updated_at")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use megastore_core::Price;
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::firestore::types::CATALOG_CURRENCY;

    fn product() -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Smartphone Nova 10".to_string(),
            category: "technology".to_string(),
            price: Price::new(Decimal::new(59999, 2), CATALOG_CURRENCY),
            brand: Some("TechCore".to_string()),
            description: None,
            image_url: Some("https://images.megastore.example/nova10.jpg".to_string()),
            attributes: std::collections::BTreeMap::new(),
        }
    }

    #[test]
    fn test_selection_predicates_category_only() {
        let selection = ProductSelection {
            category: Some("technology".to_string()),
            brands: Vec::new(),
        };
        let predicates = selection_predicates(&selection);
        assert_eq!(predicates.len(), 1);
        let value = serde_json::to_value(&predicates).expect("json");
        assert_eq!(value[0]["fieldFilter"]["op"], "EQUAL");
        assert_eq!(value[0]["fieldFilter"]["field"]["fieldPath"], "category");
    }

    #[test]
    fn test_selection_predicates_empty_for_all_categories() {
        assert!(selection_predicates(&ProductSelection::default()).is_empty());
    }

    #[test]
    fn test_selection_caps_brand_membership() {
        let selection = ProductSelection {
            category: None,
            brands: (0..15).map(|i| format!("brand-{i}")).collect(),
        };
        let predicates = selection_predicates(&selection);
        let value = serde_json::to_value(&predicates).expect("json");
        let values = value[0]["fieldFilter"]["value"]["arrayValue"]["values"]
            .as_array()
            .expect("array")
            .len();
        assert_eq!(values, MAX_MEMBERSHIP_VALUES);
    }

    #[test]
    fn test_add_line_write_is_one_atomic_increment() {
        let write = add_line_write("projects/p/databases/(default)/documents/carts/g1", &product(), 2);
        let value = serde_json::to_value(&write).expect("json");

        // Snapshot fields are masked, quantity is a transform - never a
        // read-modify-write
        assert_eq!(
            value["updateMask"]["fieldPaths"],
            json!(["items.p1.name", "items.p1.price", "items.p1.image"])
        );
        assert_eq!(
            value["updateTransforms"][0],
            json!({"fieldPath": "items.p1.quantity", "increment": {"integerValue": "2"}})
        );
        assert_eq!(
            value["update"]["fields"]["items"]["mapValue"]["fields"]["p1"]["mapValue"]["fields"]
                ["name"],
            json!({"stringValue": "Smartphone Nova 10"})
        );
    }

    #[test]
    fn test_remove_line_write_masks_without_value() {
        let write = remove_line_write(
            "projects/p/databases/(default)/documents/carts/g1",
            &ProductId::new("p1"),
        );
        let value = serde_json::to_value(&write).expect("json");

        assert_eq!(value["updateMask"]["fieldPaths"], json!(["items.p1"]));
        // No value for the masked path: the whole line is deleted
        assert!(
            value["update"]
                .get("fields")
                .is_none()
        );
    }
}
