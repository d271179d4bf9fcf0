//! Seed the remote products collection with the sample catalog.
//!
//! Idempotent by default: a non-empty collection is left alone unless
//! `--force` is passed. The storefront itself never writes products; this
//! command exists so a fresh project has something to browse.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::info;

use megastore_core::Price;
use megastore_storefront::config::StorefrontConfig;
use megastore_storefront::firestore::types::{CATALOG_CURRENCY, NewProduct, ProductSelection};
use megastore_storefront::firestore::StoreGateway;

/// Seed the catalog.
///
/// # Errors
///
/// Returns an error if configuration is missing or a store write fails.
pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = StorefrontConfig::from_env()?;

    let gateway = StoreGateway::new(config.firestore.clone());
    let client = gateway.client().await?;

    let existing = client.query_products(&ProductSelection::default()).await?;
    if !existing.is_empty() && !force {
        info!(
            count = existing.len(),
            "Products collection is not empty, skipping seed (use --force to seed anyway)"
        );
        return Ok(());
    }

    let catalog = sample_catalog();
    info!(count = catalog.len(), "Seeding sample catalog");

    for product in &catalog {
        let id = client.create_product(product).await?;
        info!(id = %id, name = %product.name, "Created product");
    }

    info!("Seeding complete");
    Ok(())
}

fn price(cents: i64) -> Price {
    Price::new(Decimal::new(cents, 2), CATALOG_CURRENCY)
}

fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// The sample catalog: a handful of products per category, each with the
/// category-dependent attribute the filter rail surfaces (capacity for
/// technology, size for apparel, material for home).
fn sample_catalog() -> Vec<NewProduct> {
    let product = |name: &str,
                   category: &str,
                   brand: &str,
                   unit_price: Price,
                   description: &str,
                   image: &str,
                   attributes: BTreeMap<String, String>| {
        NewProduct {
            name: name.to_string(),
            category: category.to_string(),
            price: unit_price,
            brand: Some(brand.to_string()),
            description: Some(description.to_string()),
            image_url: Some(image.to_string()),
            attributes,
        }
    };

    vec![
        // Technology
        product(
            "Smartphone Nova 10",
            "technology",
            "TechCore",
            price(59_999),
            "The latest model with a 108MP camera.",
            "https://placehold.co/300x300/1e40af/ffffff?text=Smartphone",
            attrs(&[("capacity", "128GB")]),
        ),
        product(
            "Bluetooth Headphones P3",
            "technology",
            "SoundMax",
            price(7_950),
            "Active noise cancellation, all-day battery.",
            "https://placehold.co/300x300/10b981/ffffff?text=Headphones",
            attrs(&[("capacity", "24h battery")]),
        ),
        product(
            "27\" Curved Monitor Pro",
            "technology",
            "ViewMaster",
            price(34_900),
            "Built for gaming and work alike.",
            "https://placehold.co/300x300/f59e0b/ffffff?text=Monitor",
            attrs(&[("capacity", "4K")]),
        ),
        // Apparel
        product(
            "Classic Slim Fit Jeans",
            "apparel",
            "DenimX",
            price(4_599),
            "Organic cotton, dark blue wash.",
            "https://placehold.co/300x300/ef4444/ffffff?text=Jeans",
            attrs(&[("size", "L")]),
        ),
        product(
            "Alpine Winter Jacket",
            "apparel",
            "Climber",
            price(12_999),
            "Waterproof shell with a thermal lining.",
            "https://placehold.co/300x300/3b82f6/ffffff?text=Jacket",
            attrs(&[("size", "M")]),
        ),
        product(
            "DRI-FIT Sports Tee",
            "apparel",
            "Athletik",
            price(2_450),
            "Breathable training tee that wicks sweat away.",
            "https://placehold.co/300x300/8b5cf6/ffffff?text=Tee",
            attrs(&[("size", "S")]),
        ),
        // Home
        product(
            "Automatic Espresso Machine",
            "home",
            "BaristaPro",
            price(28_990),
            "Bean-to-cup espresso with a milk frother.",
            "https://placehold.co/300x300/78350f/ffffff?text=Espresso",
            attrs(&[("material", "stainless steel")]),
        ),
        product(
            "Linen Sheet Set",
            "home",
            "RealDream",
            price(6_500),
            "Stonewashed linen, king size.",
            "https://placehold.co/300x300/0ea5e9/ffffff?text=Sheets",
            attrs(&[("material", "linen")]),
        ),
        product(
            "Smart Robot Vacuum",
            "home",
            "CleanBot",
            price(39_900),
            "Maps your home and empties itself.",
            "https://placehold.co/300x300/475569/ffffff?text=Vacuum",
            attrs(&[("material", "ABS plastic")]),
        ),
        product(
            "LED Desk Lamp",
            "home",
            "Lumina",
            price(3_250),
            "Adjustable color temperature, USB charging port.",
            "https://placehold.co/300x300/eab308/ffffff?text=Lamp",
            attrs(&[("material", "aluminum")]),
        ),
    ]
}
