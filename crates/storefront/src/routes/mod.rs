//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redirect to the catalog
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (store gate)
//!
//! # Catalog
//! GET  /catalog                - Catalog page (category, brand, price, sort)
//! GET  /catalog/grid           - Product grid fragment (HTMX filter changes)
//!
//! # Products
//! GET  /products/{id}          - Product detail, or not-found state
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add N units (returns count badge, triggers cart-updated)
//! POST /cart/remove            - Remove a line (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//! ```

pub mod cart;
pub mod catalog;
pub mod products;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/grid", get(catalog::grid))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new().route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // The landing page is the catalog
        .route("/", get(|| async { Redirect::to("/catalog") }))
        // Catalog routes
        .nest("/catalog", catalog_routes())
        // Product routes
        .nest("/products", product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
}
