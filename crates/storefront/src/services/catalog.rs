//! Catalog queries over the product list.
//!
//! The backend only lists products, so filtering, lookup and grouping all
//! happen here on a fetched list.

use bazaar_core::ProductId;
use serde::Serialize;
use url::Url;

use crate::api::types::{Deal, Product, ProductSummary};

/// Group label for products without a category.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Products whose category equals `category`, ignoring case.
#[must_use]
pub fn in_category(products: Vec<Product>, category: &str) -> Vec<Product> {
    products
        .into_iter()
        .filter(|p| {
            p.category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category))
        })
        .collect()
}

/// Products whose name or description contains `query`, ignoring case.
#[must_use]
pub fn search(products: Vec<Product>, query: &str) -> Vec<Product> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return products;
    }

    products
        .into_iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&query)
                || p
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&query))
        })
        .collect()
}

/// Look up one product in a fetched list.
#[must_use]
pub fn find(products: Vec<Product>, id: ProductId) -> Option<Product> {
    products.into_iter().find(|p| p.id == id)
}

/// Products sharing a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub products: Vec<Product>,
}

/// Group products by category, in order of first appearance.
#[must_use]
pub fn group_by_category(products: Vec<Product>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();

    for product in products {
        let category = product
            .category
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        match groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.products.push(product),
            None => groups.push(CategoryGroup {
                category,
                products: vec![product],
            }),
        }
    }

    groups
}

/// A deal with the product it promotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DealListing {
    pub deal: Deal,
    pub product: Option<ProductSummary>,
}

/// Attach each deal's product, preferring the copy embedded in the deal.
#[must_use]
pub fn join_deals(deals: Vec<Deal>, products: &[Product]) -> Vec<DealListing> {
    deals
        .into_iter()
        .map(|deal| {
            let product = deal.product.clone().or_else(|| {
                products
                    .iter()
                    .find(|p| p.id == deal.product_id)
                    .map(|p| ProductSummary {
                        id: p.id,
                        name: p.name.clone(),
                        price: p.price,
                        image: p.image.clone(),
                        description: p.description.clone(),
                    })
            });
            DealListing { deal, product }
        })
        .collect()
}

/// Public URL of a stored image.
#[must_use]
pub fn image_url(storage_base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        storage_base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
