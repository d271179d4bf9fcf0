//! Product detail route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use megastore_core::ProductId;

use crate::error::AppError;
use crate::filters;
use crate::firestore::StoreError;
use crate::firestore::types::Product;
use crate::state::AppState;

/// Maximum units the quantity stepper accepts per add.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Product detail display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub category: String,
    pub brand: Option<String>,
    pub price: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Category-dependent attributes, in stable (sorted) order.
    pub attributes: Vec<(String, String)>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            brand: product.brand.clone(),
            price: product.price.display(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            attributes: product
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
    pub max_quantity: u32,
}

/// Product not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/not_found.html")]
pub struct ProductNotFoundTemplate {
    pub product_id: String,
}

/// Display the product detail page, or the not-found state.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let product_id = ProductId::new(id);

    let result = match state.store().client().await {
        Ok(client) => client.get_product(&product_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(product) => ProductShowTemplate {
            product: ProductView::from(&product),
            max_quantity: MAX_LINE_QUANTITY,
        }
        .into_response(),
        Err(StoreError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            ProductNotFoundTemplate {
                product_id: product_id.to_string(),
            },
        )
            .into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}
