//! Catalog route handlers.
//!
//! One query pipeline per request: server-side selection against the store,
//! residual price filter and sort in memory, template projection. A filter
//! change re-issues the whole query via the grid fragment; the filter form
//! carries `hx-sync="this:replace"` so a newer change aborts the in-flight
//! request instead of racing it.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::catalog::{BrandFacet, CatalogQuery, CategorySelector, SortOrder};
use crate::error::Result;
use crate::filters;
use crate::firestore::types::Product;
use crate::state::AppState;

/// Product card display data for templates.
#[derive(Clone)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub brand: Option<String>,
    pub price: String,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            price: product.price.display(),
            image_url: product.image_url.clone(),
        }
    }
}

/// Catalog filter query parameters.
#[derive(Debug, Deserialize)]
pub struct CatalogParams {
    /// Category tag, or `all`.
    pub cat: Option<String>,
    /// Comma-separated brand names.
    pub brands: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
}

impl CatalogParams {
    /// Build the per-request filter state. Unparseable price bounds are
    /// ignored rather than erroring, matching how the filter rail degrades.
    fn to_query(&self) -> CatalogQuery {
        CatalogQuery {
            category: CategorySelector::from_param(self.cat.as_deref()),
            brands: self
                .brands
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect(),
            min_price: parse_price(self.min_price.as_deref()),
            max_price: parse_price(self.max_price.as_deref()),
            sort: SortOrder::from_param(self.sort.as_deref()),
        }
    }
}

fn parse_price(param: Option<&str>) -> Option<Decimal> {
    param
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<Decimal>().ok())
}

/// A brand facet with its toggle link, ready for the filter rail.
///
/// Clicking a facet navigates to the catalog with that brand added to (or
/// removed from) the selection, everything else preserved - the filter
/// change IS the re-issued query.
#[derive(Clone)]
pub struct BrandFacetView {
    pub name: String,
    pub selected: bool,
    pub href: String,
}

/// Catalog URL for the given filter state with `brands` swapped in.
fn catalog_href(query: &CatalogQuery, brands: &[String]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("cat", query.category.as_param());
    if !brands.is_empty() {
        serializer.append_pair("brands", &brands.join(","));
    }
    if let Some(min) = query.min_price {
        serializer.append_pair("min_price", &min.to_string());
    }
    if let Some(max) = query.max_price {
        serializer.append_pair("max_price", &max.to_string());
    }
    if query.sort != SortOrder::Default {
        serializer.append_pair("sort", query.sort.as_param());
    }
    format!("/catalog?{}", serializer.finish())
}

fn facet_views(query: &CatalogQuery, facets: Vec<BrandFacet>) -> Vec<BrandFacetView> {
    facets
        .into_iter()
        .map(|facet| {
            let toggled: Vec<String> = if facet.selected {
                query
                    .brands
                    .iter()
                    .filter(|b| **b != facet.name)
                    .cloned()
                    .collect()
            } else {
                let mut brands = query.brands.clone();
                brands.push(facet.name.clone());
                brands
            };
            BrandFacetView {
                href: catalog_href(query, &toggled),
                selected: facet.selected,
                name: facet.name,
            }
        })
        .collect()
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub title: String,
    pub category: String,
    pub facets: Vec<BrandFacetView>,
    pub clear_brands_href: String,
    pub brands_param: String,
    pub min_price: String,
    pub max_price: String,
    pub sort: &'static str,
    pub products: Vec<ProductCard>,
}

/// Product grid fragment template (for HTMX filter changes).
#[derive(Template, WebTemplate)]
#[template(path = "catalog/grid.html")]
pub struct CatalogGridTemplate {
    pub products: Vec<ProductCard>,
}

/// Run one catalog query end to end: store selection, then refinement.
async fn query_catalog(state: &AppState, query: &CatalogQuery) -> Result<Vec<Product>> {
    let client = state.store().client().await?;
    let products = client.query_products(&query.selection()).await?;
    Ok(query.refine(products))
}

/// Display the catalog page.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Result<CatalogTemplate> {
    let query = params.to_query();
    let products = query_catalog(&state, &query).await?;
    let facets = crate::catalog::brand_facets(&products, &query.brands);

    Ok(CatalogTemplate {
        title: query.category.title(),
        category: query.category.as_param().to_string(),
        clear_brands_href: catalog_href(&query, &[]),
        facets: facet_views(&query, facets),
        brands_param: query.brands.join(","),
        min_price: params.min_price.unwrap_or_default(),
        max_price: params.max_price.unwrap_or_default(),
        sort: query.sort.as_param(),
        products: products.iter().map(ProductCard::from).collect(),
    })
}

/// Display the product grid fragment (HTMX re-query on filter change).
#[instrument(skip(state))]
pub async fn grid(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Result<CatalogGridTemplate> {
    let query = params.to_query();
    let products = query_catalog(&state, &query).await?;

    Ok(CatalogGridTemplate {
        products: products.iter().map(ProductCard::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(
        cat: Option<&str>,
        brands: Option<&str>,
        min: Option<&str>,
        max: Option<&str>,
    ) -> CatalogParams {
        CatalogParams {
            cat: cat.map(ToString::to_string),
            brands: brands.map(ToString::to_string),
            min_price: min.map(ToString::to_string),
            max_price: max.map(ToString::to_string),
            sort: None,
        }
    }

    #[test]
    fn test_params_parse_brand_list() {
        let query = params(Some("technology"), Some("TechCore, SoundMax,"), None, None).to_query();
        assert_eq!(
            query.brands,
            vec!["TechCore".to_string(), "SoundMax".to_string()]
        );
        assert_eq!(
            query.category,
            CategorySelector::Only("technology".to_string())
        );
    }

    #[test]
    fn test_params_ignore_unparseable_prices() {
        let query = params(None, None, Some("abc"), Some("250.50")).to_query();
        assert_eq!(query.min_price, None);
        assert_eq!(query.max_price, Some(Decimal::new(25050, 2)));
    }

    #[test]
    fn test_params_default_to_all_categories() {
        let query = params(None, None, None, None).to_query();
        assert_eq!(query.category, CategorySelector::All);
        assert!(query.brands.is_empty());
        assert_eq!(query.sort, SortOrder::Default);
    }

    #[test]
    fn test_catalog_href_preserves_other_filters() {
        let query = params(
            Some("technology"),
            Some("TechCore"),
            Some("100"),
            None,
        )
        .to_query();
        let href = catalog_href(&query, &["TechCore".to_string(), "SoundMax".to_string()]);
        assert_eq!(
            href,
            "/catalog?cat=technology&brands=TechCore%2CSoundMax&min_price=100"
        );
    }

    #[test]
    fn test_facet_views_toggle_selection() {
        let query = params(None, Some("TechCore"), None, None).to_query();
        let views = facet_views(
            &query,
            vec![
                BrandFacet {
                    name: "SoundMax".to_string(),
                    selected: false,
                },
                BrandFacet {
                    name: "TechCore".to_string(),
                    selected: true,
                },
            ],
        );

        // Unselected facet's link adds it to the selection
        assert!(views[0].href.contains("TechCore%2CSoundMax"));
        // Selected facet's link removes it
        assert!(!views[1].href.contains("TechCore"));
    }
}
