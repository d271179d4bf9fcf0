//! Catalog filtering pipeline.
//!
//! The store's query language can combine exact-match and set-membership
//! predicates, but not a price range on top of them without extra indexing.
//! So a catalog page is: server-side selection (category, brands) issued by
//! the store client, then the residual filter (price range) and the sort
//! order applied here, in memory, on the page's own result set.
//!
//! Everything in this module is pure: the per-request [`CatalogQuery`] is
//! the only state, built from the request parameters each time.

use rust_decimal::Decimal;

use crate::firestore::types::{Product, ProductSelection};

/// Category selector from the navigation parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategorySelector {
    /// Every category.
    #[default]
    All,
    /// One exact category tag.
    Only(String),
}

impl CategorySelector {
    /// Parse the `cat` navigation parameter (`all`, empty or absent selects
    /// every category).
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None | Some("" | "all") => Self::All,
            Some(category) => Self::Only(category.to_string()),
        }
    }

    /// The value to render back into links and form state.
    #[must_use]
    pub fn as_param(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Only(category) => category,
        }
    }

    /// Heading for the catalog page.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::All => "All products".to_string(),
            Self::Only(category) => match category.as_str() {
                "technology" => "Technology".to_string(),
                "apparel" => "Apparel".to_string(),
                "home" => "Home & living".to_string(),
                other => format!("Category: {other}"),
            },
        }
    }
}

/// Sort order for the catalog, applied after the residual filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Store order (no client-side reordering).
    #[default]
    Default,
    PriceAscending,
    PriceDescending,
    NameAscending,
}

impl SortOrder {
    /// Parse the `sort` navigation parameter; unknown values fall back to
    /// the store order.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("price_asc") => Self::PriceAscending,
            Some("price_desc") => Self::PriceDescending,
            Some("name_asc") => Self::NameAscending,
            _ => Self::Default,
        }
    }

    /// The value to render back into the sort selector.
    #[must_use]
    pub const fn as_param(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::PriceAscending => "price_asc",
            Self::PriceDescending => "price_desc",
            Self::NameAscending => "name_asc",
        }
    }
}

/// One catalog page's complete filter state, built per request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub category: CategorySelector,
    pub brands: Vec<String>,
    /// Inclusive lower price bound; `None` means 0.
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound; `None` means unbounded.
    pub max_price: Option<Decimal>,
    pub sort: SortOrder,
}

impl CatalogQuery {
    /// The server-side half of the query (what the store evaluates).
    #[must_use]
    pub fn selection(&self) -> ProductSelection {
        ProductSelection {
            category: match &self.category {
                CategorySelector::All => None,
                CategorySelector::Only(category) => Some(category.clone()),
            },
            brands: self.brands.clone(),
        }
    }

    /// The client-side half: residual price filter, then sort.
    #[must_use]
    pub fn refine(&self, products: Vec<Product>) -> Vec<Product> {
        let mut products = apply_price_range(products, self.min_price, self.max_price);
        sort_products(&mut products, self.sort);
        products
    }
}

/// Keep products whose price lies in `[min, max]` (inclusive); an unset
/// bound does not constrain.
#[must_use]
pub fn apply_price_range(
    products: Vec<Product>,
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> Vec<Product> {
    let min = min.unwrap_or(Decimal::ZERO);
    products
        .into_iter()
        .filter(|p| p.price.amount >= min && max.is_none_or(|max| p.price.amount <= max))
        .collect()
}

/// Sort in place; stable, so the store order survives within equal keys.
pub fn sort_products(products: &mut [Product], sort: SortOrder) {
    match sort {
        SortOrder::Default => {}
        SortOrder::PriceAscending => products.sort_by(|a, b| a.price.amount.cmp(&b.price.amount)),
        SortOrder::PriceDescending => products.sort_by(|a, b| b.price.amount.cmp(&a.price.amount)),
        SortOrder::NameAscending => products.sort_by(|a, b| a.name.cmp(&b.name)),
    }
}

/// A brand checkbox in the filter rail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandFacet {
    pub name: String,
    pub selected: bool,
}

/// Distinct brands of the rendered result set, unioned with the currently
/// selected brands (so a selection that filtered itself out of the results
/// can still be cleared), sorted by name.
#[must_use]
pub fn brand_facets(products: &[Product], selected: &[String]) -> Vec<BrandFacet> {
    let mut brands: Vec<String> = products
        .iter()
        .filter_map(|p| p.brand.clone())
        .chain(selected.iter().cloned())
        .collect();
    brands.sort();
    brands.dedup();

    brands
        .into_iter()
        .map(|name| {
            let selected = selected.contains(&name);
            BrandFacet { name, selected }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use megastore_core::{Price, ProductId};
    use std::collections::BTreeMap;

    use crate::firestore::types::CATALOG_CURRENCY;

    fn product(name: &str, amount: i64, brand: Option<&str>) -> Product {
        Product {
            id: ProductId::new(name.to_lowercase()),
            name: name.to_string(),
            category: "technology".to_string(),
            price: Price::new(Decimal::from(amount), CATALOG_CURRENCY),
            brand: brand.map(ToString::to_string),
            description: None,
            image_url: None,
            attributes: BTreeMap::new(),
        }
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_price_range_is_inclusive_on_both_bounds() {
        let products = vec![
            product("A", 100, None),
            product("B", 200, None),
            product("C", 300, None),
        ];
        let kept = apply_price_range(
            products,
            Some(Decimal::from(100)),
            Some(Decimal::from(200)),
        );
        assert_eq!(names(&kept), vec!["A", "B"]);
        for p in &kept {
            assert!(p.price.amount >= Decimal::from(100));
            assert!(p.price.amount <= Decimal::from(200));
        }
    }

    #[test]
    fn test_unset_max_applies_only_lower_bound() {
        let products = vec![
            product("Cheap", 50, None),
            product("Mid", 150, None),
            product("Dear", 999, None),
        ];
        let kept = apply_price_range(products, Some(Decimal::from(100)), None);
        assert_eq!(names(&kept), vec!["Mid", "Dear"]);
    }

    #[test]
    fn test_unset_bounds_keep_everything() {
        let products = vec![product("A", 1, None), product("B", 2, None)];
        assert_eq!(apply_price_range(products, None, None).len(), 2);
    }

    #[test]
    fn test_sort_by_ascending_price() {
        let mut products = vec![
            product("X", 300, None),
            product("Y", 100, None),
            product("Z", 200, None),
        ];
        sort_products(&mut products, SortOrder::PriceAscending);
        let prices: Vec<i64> = products
            .iter()
            .map(|p| {
                use rust_decimal::prelude::ToPrimitive;
                p.price.amount.to_i64().expect("integer price")
            })
            .collect();
        assert_eq!(prices, vec![100, 200, 300]);
    }

    #[test]
    fn test_sort_by_descending_price() {
        let mut products = vec![product("X", 100, None), product("Y", 300, None)];
        sort_products(&mut products, SortOrder::PriceDescending);
        assert_eq!(names(&products), vec!["Y", "X"]);
    }

    #[test]
    fn test_sort_by_name_is_lexicographic() {
        let mut products = vec![product("Zeta", 1, None), product("Alpha", 2, None)];
        sort_products(&mut products, SortOrder::NameAscending);
        assert_eq!(names(&products), vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_default_sort_preserves_store_order() {
        let mut products = vec![product("B", 2, None), product("A", 1, None)];
        sort_products(&mut products, SortOrder::Default);
        assert_eq!(names(&products), vec!["B", "A"]);
    }

    #[test]
    fn test_refine_filters_then_sorts() {
        let query = CatalogQuery {
            min_price: Some(Decimal::from(100)),
            sort: SortOrder::PriceAscending,
            ..CatalogQuery::default()
        };
        let refined = query.refine(vec![
            product("Dear", 300, None),
            product("Cheap", 50, None),
            product("Mid", 150, None),
        ]);
        assert_eq!(names(&refined), vec!["Mid", "Dear"]);
    }

    #[test]
    fn test_selection_carries_server_side_predicates_only() {
        let query = CatalogQuery {
            category: CategorySelector::Only("technology".to_string()),
            brands: vec!["TechCore".to_string()],
            min_price: Some(Decimal::from(100)),
            ..CatalogQuery::default()
        };
        let selection = query.selection();
        assert_eq!(selection.category.as_deref(), Some("technology"));
        assert_eq!(selection.brands, vec!["TechCore".to_string()]);
    }

    #[test]
    fn test_all_category_has_no_server_predicate() {
        let query = CatalogQuery::default();
        assert_eq!(query.selection(), ProductSelection::default());
    }

    #[test]
    fn test_brand_facets_union_selected_with_results() {
        let products = vec![
            product("A", 1, Some("TechCore")),
            product("B", 2, Some("SoundMax")),
            product("C", 3, Some("TechCore")),
            product("D", 4, None),
        ];
        let selected = vec!["ViewMaster".to_string()];
        let facets = brand_facets(&products, &selected);

        let names: Vec<&str> = facets.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["SoundMax", "TechCore", "ViewMaster"]);
        assert!(facets.iter().find(|f| f.name == "ViewMaster").is_some_and(|f| f.selected));
        assert!(facets.iter().find(|f| f.name == "TechCore").is_some_and(|f| !f.selected));
    }

    #[test]
    fn test_category_selector_parses_navigation_param() {
        assert_eq!(CategorySelector::from_param(None), CategorySelector::All);
        assert_eq!(
            CategorySelector::from_param(Some("all")),
            CategorySelector::All
        );
        assert_eq!(
            CategorySelector::from_param(Some("home")),
            CategorySelector::Only("home".to_string())
        );
    }

    #[test]
    fn test_sort_order_parses_navigation_param() {
        assert_eq!(SortOrder::from_param(Some("price_asc")), SortOrder::PriceAscending);
        assert_eq!(SortOrder::from_param(Some("bogus")), SortOrder::Default);
        assert_eq!(SortOrder::from_param(None), SortOrder::Default);
    }
}
