//! Domain types for the document store.
//!
//! These types provide a clean, validated API separate from the raw wire
//! types: anything that reaches a route handler has already passed the
//! store-boundary checks in `convert`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use megastore_core::{CurrencyCode, GuestId, Price, ProductId};

/// Currency the catalog is priced in. The store documents carry bare
/// numeric prices; the currency is a property of the storefront.
pub const CATALOG_CURRENCY: CurrencyCode = CurrencyCode::USD;

// =============================================================================
// Product Types
// =============================================================================

/// A product in the catalog.
///
/// Immutable from the storefront's perspective; owned and mutated only by
/// the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned document id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Category tag (e.g., `technology`, `apparel`, `home`).
    pub category: String,
    /// Unit price.
    pub price: Price,
    /// Brand name, when the document carries one.
    pub brand: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Image URL, passed through untouched.
    pub image_url: Option<String>,
    /// Category-dependent attributes (size, capacity, material, ...).
    pub attributes: BTreeMap<String, String>,
}

/// Server-side product predicates for a catalog query.
///
/// Only the predicates the store's query language can combine without extra
/// indexing: exact-match category and brand set-membership. Price range and
/// ordering are residual (client-side) concerns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductSelection {
    /// Exact category match; `None` selects every category.
    pub category: Option<String>,
    /// Brand membership; empty means no brand predicate.
    pub brands: Vec<String>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// A line in a guest cart.
///
/// Name, price and image are denormalized snapshots captured at add time,
/// so the cart renders even if the product document changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product this line refers to.
    pub product_id: ProductId,
    /// Product name at add time.
    pub name: String,
    /// Unit price at add time.
    pub price: Price,
    /// Image URL at add time.
    pub image_url: Option<String>,
    /// Number of units; always >= 1 for a decoded line.
    pub quantity: u32,
}

impl CartLine {
    /// Per-line subtotal (`price * quantity`).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A guest cart: one remote document, lines keyed by product id.
///
/// The keyed map makes the one-line-per-product invariant structural - a
/// repeat add can only increment an existing line, never duplicate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart lines, keyed (and therefore ordered) by product id.
    pub lines: BTreeMap<ProductId, CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines (the cart badge number).
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.values().map(|line| line.quantity).sum()
    }

    /// Overall subtotal across all lines.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines.values().fold(
            Price::zero(CATALOG_CURRENCY),
            |acc, line| Price::new(acc.amount + line.line_total().amount, acc.currency_code),
        )
    }
}

/// Resource id of a guest's cart document within the `carts` collection.
#[must_use]
pub fn cart_document_id(guest: &GuestId) -> String {
    guest.to_string()
}

// =============================================================================
// Seed Types
// =============================================================================

/// A product to be created in the store (no id yet - the store assigns one).
///
/// Only the seed CLI writes products; the storefront never does.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: Price,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(id: &str, cents: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Price::new(Decimal::new(cents, 2), CATALOG_CURRENCY),
            image_url: None,
            quantity,
        }
    }

    #[test]
    fn test_line_total_multiplies_unit_price() {
        let line = line("p1", 7950, 3);
        assert_eq!(line.line_total().display(), "$238.50");
    }

    #[test]
    fn test_cart_subtotal_and_quantity() {
        let mut cart = Cart::empty();
        cart.lines
            .insert(ProductId::new("p1"), line("p1", 59999, 1));
        cart.lines
            .insert(ProductId::new("p2"), line("p2", 4599, 2));

        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.subtotal().display(), "$691.97");
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::empty();
        assert!(cart.is_empty());
        assert_eq!(cart.total_quantity(), 0);
        assert_eq!(cart.subtotal().display(), "$0.00");
    }

    #[test]
    fn test_lines_iterate_in_product_id_order() {
        let mut cart = Cart::empty();
        cart.lines.insert(ProductId::new("zzz"), line("zzz", 100, 1));
        cart.lines.insert(ProductId::new("aaa"), line("aaa", 100, 1));

        let ids: Vec<_> = cart.lines.keys().map(ProductId::as_str).collect();
        assert_eq!(ids, vec!["aaa", "zzz"]);
    }
}
