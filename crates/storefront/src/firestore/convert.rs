//! Conversions from wire documents to validated domain types.
//!
//! The store is schemaless; this module is the boundary that makes it
//! typed. Documents missing a required field are rejected with
//! [`StoreError::InvalidDocument`] instead of being defaulted into shape.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use megastore_core::{Price, ProductId};

use super::StoreError;
use super::types::{CATALOG_CURRENCY, Cart, CartLine, NewProduct, Product};
use super::wire::{Document, Value};

/// Decode a `products` document.
///
/// # Errors
///
/// Returns `InvalidDocument` if `name`, `category` or `price` is missing or
/// of the wrong type, or if the price is negative.
pub fn product_from_document(doc: &Document) -> Result<Product, StoreError> {
    let id = doc.document_id();
    if id.is_empty() {
        return Err(StoreError::InvalidDocument(
            "product document has no id".to_string(),
        ));
    }

    let name = required_string(doc, "name")?;
    let category = required_string(doc, "category")?;
    let price = required_price(doc, "price")?;

    Ok(Product {
        id: ProductId::new(id),
        name,
        category,
        price,
        brand: optional_string(doc, "brand"),
        description: optional_string(doc, "description"),
        image_url: optional_string(doc, "image"),
        attributes: string_map(doc.fields.get("attributes")),
    })
}

/// Decode a `carts/{guest_id}` document.
///
/// Lines missing their snapshot fields reject the document; lines whose
/// quantity is zero or negative are treated as absent (a removed line).
///
/// # Errors
///
/// Returns `InvalidDocument` if a line is missing `name`, `price` or
/// `quantity`, or if `items` is not a map.
pub fn cart_from_document(doc: &Document) -> Result<Cart, StoreError> {
    let Some(items) = doc.fields.get("items") else {
        return Ok(Cart::empty());
    };

    let entries = items.as_map().ok_or_else(|| {
        StoreError::InvalidDocument(format!(
            "cart {}: items is not a map",
            doc.document_id()
        ))
    })?;

    let mut cart = Cart::empty();
    for (product_id, entry) in entries {
        let fields = entry.as_map().ok_or_else(|| {
            StoreError::InvalidDocument(format!("cart line {product_id}: not a map"))
        })?;

        let quantity = fields
            .get("quantity")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                StoreError::InvalidDocument(format!("cart line {product_id}: missing quantity"))
            })?;

        // A non-positive quantity is a removed line, not a cart line.
        let Ok(quantity) = u32::try_from(quantity) else {
            continue;
        };
        if quantity == 0 {
            continue;
        }

        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                StoreError::InvalidDocument(format!("cart line {product_id}: missing name"))
            })?
            .to_string();
        let price = price_from_value(fields.get("price")).ok_or_else(|| {
            StoreError::InvalidDocument(format!("cart line {product_id}: missing price"))
        })?;
        let image_url = fields
            .get("image")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        let product_id = ProductId::new(product_id.as_str());
        cart.lines.insert(
            product_id.clone(),
            CartLine {
                product_id,
                name,
                price,
                image_url,
                quantity,
            },
        );
    }

    Ok(cart)
}

/// Encode a new product into document fields (the seed direction).
#[must_use]
pub fn new_product_fields(product: &NewProduct) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), Value::string(product.name.clone()));
    fields.insert(
        "category".to_string(),
        Value::string(product.category.clone()),
    );
    fields.insert(
        "price".to_string(),
        Value::double(product.price.amount.to_f64().unwrap_or_default()),
    );
    if let Some(brand) = &product.brand {
        fields.insert("brand".to_string(), Value::string(brand.clone()));
    }
    if let Some(description) = &product.description {
        fields.insert(
            "description".to_string(),
            Value::string(description.clone()),
        );
    }
    if let Some(image) = &product.image_url {
        fields.insert("image".to_string(), Value::string(image.clone()));
    }
    if !product.attributes.is_empty() {
        fields.insert(
            "attributes".to_string(),
            Value::map(
                product
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::string(v.clone())))
                    .collect(),
            ),
        );
    }
    fields
}

// =============================================================================
// Field Helpers
// =============================================================================

fn required_string(doc: &Document, field: &str) -> Result<String, StoreError> {
    doc.fields
        .get(field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            StoreError::InvalidDocument(format!(
                "product {}: missing required field `{field}`",
                doc.document_id()
            ))
        })
}

fn optional_string(doc: &Document, field: &str) -> Option<String> {
    doc.fields
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn required_price(doc: &Document, field: &str) -> Result<Price, StoreError> {
    let price = price_from_value(doc.fields.get(field)).ok_or_else(|| {
        StoreError::InvalidDocument(format!(
            "product {}: missing required field `{field}`",
            doc.document_id()
        ))
    })?;
    if price.amount < Decimal::ZERO {
        return Err(StoreError::InvalidDocument(format!(
            "product {}: negative price",
            doc.document_id()
        )));
    }
    Ok(price)
}

/// Prices arrive as `doubleValue` (seeded data) or `integerValue` (whole
/// amounts); both decode to two-decimal-place decimals.
fn price_from_value(value: Option<&Value>) -> Option<Price> {
    let amount = match value? {
        Value::IntegerValue(s) => Decimal::from(s.parse::<i64>().ok()?),
        Value::DoubleValue(d) => Decimal::from_f64(*d)?.round_dp(2),
        _ => return None,
    };
    Some(Price::new(amount, CATALOG_CURRENCY))
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_map)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(json: serde_json::Value) -> Document {
        serde_json::from_value(json).expect("document")
    }

    fn product_doc() -> Document {
        document(json!({
            "name": "projects/p/databases/(default)/documents/products/p8k2mZq4",
            "fields": {
                "name": {"stringValue": "Smartphone Nova 10"},
                "category": {"stringValue": "technology"},
                "brand": {"stringValue": "TechCore"},
                "price": {"doubleValue": 599.99},
                "description": {"stringValue": "Latest model with a 108MP camera."},
                "image": {"stringValue": "https://images.megastore.example/nova10.jpg"},
                "attributes": {"mapValue": {"fields": {
                    "capacity": {"stringValue": "128GB"}
                }}}
            }
        }))
    }

    #[test]
    fn test_product_decodes_all_fields() {
        let product = product_from_document(&product_doc()).expect("product");
        assert_eq!(product.id.as_str(), "p8k2mZq4");
        assert_eq!(product.name, "Smartphone Nova 10");
        assert_eq!(product.category, "technology");
        assert_eq!(product.brand.as_deref(), Some("TechCore"));
        assert_eq!(product.price.display(), "$599.99");
        assert_eq!(product.attributes.get("capacity").map(String::as_str), Some("128GB"));
    }

    #[test]
    fn test_product_missing_required_field_is_rejected() {
        let mut doc = product_doc();
        doc.fields.remove("price");
        let err = product_from_document(&doc).expect_err("must reject");
        assert!(matches!(err, StoreError::InvalidDocument(_)));
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_product_wrong_type_is_rejected() {
        let mut doc = product_doc();
        doc.fields
            .insert("name".to_string(), Value::integer(7));
        assert!(matches!(
            product_from_document(&doc),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_product_negative_price_is_rejected() {
        let mut doc = product_doc();
        doc.fields
            .insert("price".to_string(), Value::double(-1.0));
        assert!(matches!(
            product_from_document(&doc),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_product_integer_price_decodes() {
        let mut doc = product_doc();
        doc.fields
            .insert("price".to_string(), Value::integer(45));
        let product = product_from_document(&doc).expect("product");
        assert_eq!(product.price.display(), "$45.00");
    }

    #[test]
    fn test_cart_decodes_lines_keyed_by_product_id() {
        // The document shape after adding the same product twice (quantity
        // incremented in place) plus one other product: two lines, not three.
        let doc = document(json!({
            "name": "projects/p/databases/(default)/documents/carts/g1",
            "fields": {
                "items": {"mapValue": {"fields": {
                    "p1": {"mapValue": {"fields": {
                        "name": {"stringValue": "Smartphone Nova 10"},
                        "price": {"doubleValue": 599.99},
                        "quantity": {"integerValue": "2"}
                    }}},
                    "p2": {"mapValue": {"fields": {
                        "name": {"stringValue": "Slim Fit Jeans"},
                        "price": {"doubleValue": 45.99},
                        "quantity": {"integerValue": "1"}
                    }}}
                }}}
            }
        }));

        let cart = cart_from_document(&doc).expect("cart");
        assert_eq!(cart.lines.len(), 2);
        let line = cart.lines.get(&ProductId::new("p1")).expect("line");
        assert_eq!(line.quantity, 2);
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.subtotal().display(), "$1245.97");
    }

    #[test]
    fn test_cart_zero_quantity_line_is_absent() {
        let doc = document(json!({
            "name": "projects/p/databases/(default)/documents/carts/g1",
            "fields": {
                "items": {"mapValue": {"fields": {
                    "p1": {"mapValue": {"fields": {
                        "name": {"stringValue": "Gone"},
                        "price": {"doubleValue": 10.0},
                        "quantity": {"integerValue": "0"}
                    }}}
                }}}
            }
        }));

        let cart = cart_from_document(&doc).expect("cart");
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_without_items_is_empty() {
        let doc = document(json!({
            "name": "projects/p/databases/(default)/documents/carts/g1"
        }));
        assert!(cart_from_document(&doc).expect("cart").is_empty());
    }

    #[test]
    fn test_seeded_product_decodes_back() {
        use megastore_core::Price;
        use rust_decimal::Decimal;

        let seed = NewProduct {
            name: "Espresso Machine".to_string(),
            category: "home".to_string(),
            price: Price::new(Decimal::new(15999, 2), CATALOG_CURRENCY),
            brand: Some("BaristaPro".to_string()),
            description: None,
            image_url: None,
            attributes: BTreeMap::from([("material".to_string(), "steel".to_string())]),
        };

        let doc = Document {
            name: "projects/p/databases/(default)/documents/products/auto1".to_string(),
            fields: new_product_fields(&seed),
            create_time: None,
            update_time: None,
        };

        let product = product_from_document(&doc).expect("product");
        assert_eq!(product.name, seed.name);
        assert_eq!(product.price, seed.price);
        assert_eq!(product.attributes.get("material").map(String::as_str), Some("steel"));
    }

    #[test]
    fn test_cart_line_missing_snapshot_is_rejected() {
        let doc = document(json!({
            "name": "projects/p/databases/(default)/documents/carts/g1",
            "fields": {
                "items": {"mapValue": {"fields": {
                    "p1": {"mapValue": {"fields": {
                        "quantity": {"integerValue": "1"}
                    }}}
                }}}
            }
        }));
        assert!(matches!(
            cart_from_document(&doc),
            Err(StoreError::InvalidDocument(_))
        ));
    }
}
