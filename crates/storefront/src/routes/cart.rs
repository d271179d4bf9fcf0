//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The session stores only a guest id; the cart itself is one remote
//! document per guest, mutated with atomic field transforms. Write failures
//! are logged and degrade to re-rendering the last known state - a lost
//! update, never a broken page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use megastore_core::{GuestId, ProductId};

use crate::filters;
use crate::firestore::types::{Cart, CartLine};
use crate::models::session_keys;
use crate::routes::products::MAX_LINE_QUANTITY;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image_url: Option<String>,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.to_string(),
            name: line.name.clone(),
            quantity: line.quantity,
            price: line.price.display(),
            line_price: line.line_total().display(),
            image_url: line.image_url.clone(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    /// Create an empty cart view.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: Cart::empty().subtotal().display(),
            item_count: 0,
        }
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.lines.values().map(CartItemView::from).collect(),
            subtotal: cart.subtotal().display(),
            item_count: cart.total_quantity(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the guest id from the session, if one has been minted.
async fn get_guest_id(session: &Session) -> Option<GuestId> {
    session
        .get::<GuestId>(session_keys::GUEST_ID)
        .await
        .ok()
        .flatten()
}

/// Get the guest id, minting and storing one on first cart use.
async fn ensure_guest_id(session: &Session) -> GuestId {
    if let Some(guest) = get_guest_id(session).await {
        return guest;
    }

    let guest = GuestId::new(Uuid::new_v4().to_string());
    if let Err(e) = session.insert(session_keys::GUEST_ID, &guest).await {
        // The cart still works for this request; it just won't stick.
        tracing::error!("Failed to save guest id to session: {e}");
    }
    guest
}

/// Fetch the guest's cart, degrading to empty on failure.
async fn load_cart(state: &AppState, guest: Option<&GuestId>) -> CartView {
    let Some(guest) = guest else {
        return CartView::empty();
    };

    let result = match state.store().client().await {
        Ok(client) => client.get_cart(guest).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(cart) => CartView::from(&cart),
        Err(e) => {
            tracing::warn!("Failed to fetch cart for {guest}: {e}");
            CartView::empty()
        }
    }
}

/// Clamp a submitted quantity to the stepper bounds; the form is advisory,
/// the server decides.
fn clamp_quantity(quantity: Option<u32>) -> u32 {
    quantity.unwrap_or(1).clamp(1, MAX_LINE_QUANTITY)
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display the cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let guest = get_guest_id(&session).await;
    let cart = load_cart(&state, guest.as_ref()).await;

    CartShowTemplate { cart }
}

/// Add N units of a product to the cart (HTMX).
///
/// Quantity is clamped to the stepper bounds server-side. Returns the cart
/// count badge plus an HTMX trigger so other fragments refresh.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let quantity = clamp_quantity(form.quantity);
    let product_id = ProductId::new(form.product_id);
    let guest = ensure_guest_id(&session).await;

    let result = match state.store().client().await {
        Ok(client) => match client.get_product(&product_id).await {
            // Snapshot name/price/image at add time
            Ok(product) => client.add_to_cart(&guest, &product, quantity).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        // Storage-write-failure degrades: the update may be lost
        tracing::error!("Failed to add {product_id} to cart: {e}");
    }

    let cart = load_cart(&state, Some(&guest)).await;

    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartCountTemplate {
            count: cart.item_count,
        },
    )
        .into_response()
}

/// Remove a whole line from the cart (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let product_id = ProductId::new(form.product_id);

    let Some(guest) = get_guest_id(&session).await else {
        return CartItemsTemplate {
            cart: CartView::empty(),
        }
        .into_response();
    };

    let result = match state.store().client().await {
        Ok(client) => client.remove_from_cart(&guest, &product_id).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!("Failed to remove {product_id} from cart: {e}");
    }

    let cart = load_cart(&state, Some(&guest)).await;

    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate { cart },
    )
        .into_response()
}

/// Get the cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let guest = get_guest_id(&session).await;
    let cart = load_cart(&state, guest.as_ref()).await;

    CartCountTemplate {
        count: cart.item_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use megastore_core::Price;
    use rust_decimal::Decimal;

    use crate::firestore::types::CATALOG_CURRENCY;

    #[test]
    fn test_clamp_quantity_bounds() {
        assert_eq!(clamp_quantity(None), 1);
        assert_eq!(clamp_quantity(Some(0)), 1);
        assert_eq!(clamp_quantity(Some(5)), 5);
        assert_eq!(clamp_quantity(Some(1000)), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_cart_view_formats_line_and_overall_subtotals() {
        let mut cart = Cart::empty();
        cart.lines.insert(
            ProductId::new("p1"),
            CartLine {
                product_id: ProductId::new("p1"),
                name: "Linen Sheet Set".to_string(),
                price: Price::new(Decimal::new(6500, 2), CATALOG_CURRENCY),
                image_url: None,
                quantity: 2,
            },
        );

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.subtotal, "$130.00");
        let item = view.items.first().expect("one line");
        assert_eq!(item.price, "$65.00");
        assert_eq!(item.line_price, "$130.00");
    }
}
