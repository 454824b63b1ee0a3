//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use bazaar_core::{DealId, Price, ProductId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;
use url::Url;

use crate::api::types::{Product, ProductSummary};
use crate::error::{AppError, Result};
use crate::services::catalog::{self, CategoryGroup, DealListing};
use crate::state::AppState;
use crate::storage::{SessionStore, keys};

/// Product display data.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub amount: Price,
    pub stock: Option<u32>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, storage: &Url) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.display(),
            amount: product.price,
            stock: product.stock,
            category: product.category.clone(),
            image_url: product
                .image
                .as_deref()
                .map(|path| catalog::image_url(storage, path)),
        }
    }

    #[must_use]
    pub fn from_summary(product: &ProductSummary, storage: &Url) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.display(),
            amount: product.price,
            stock: None,
            category: None,
            image_url: product
                .image
                .as_deref()
                .map(|path| catalog::image_url(storage, path)),
        }
    }
}

/// Products of one category.
#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub category: String,
    pub products: Vec<ProductView>,
}

/// A deal and its product.
#[derive(Debug, Serialize)]
pub struct DealView {
    pub id: DealId,
    pub title: String,
    pub description: Option<String>,
    pub product: Option<ProductView>,
}

/// Catalog filters.
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

fn views(products: &[Product], storage: &Url) -> Vec<ProductView> {
    products
        .iter()
        .map(|p| ProductView::new(p, storage))
        .collect()
}

/// Product listing, optionally filtered by category and search text.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<ProductView>>> {
    let mut products = state.api().products().await?;

    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        products = catalog::in_category(products, category);
    }
    if let Some(q) = query.q.as_deref() {
        products = catalog::search(products, q);
    }

    Ok(Json(views(&products, &state.config().storage_url)))
}

/// Products grouped by category.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryView>>> {
    let storage = &state.config().storage_url;
    let groups = catalog::group_by_category(state.api().products().await?);

    let grouped = groups
        .into_iter()
        .map(|CategoryGroup { category, products }| CategoryView {
            category,
            products: views(&products, storage),
        })
        .collect();
    Ok(Json(grouped))
}

/// Product detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = catalog::find(state.api().products().await?, id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(Json(ProductView::new(&product, &state.config().storage_url)))
}

/// Deals joined with their products.
///
/// The admin token is sent when the browser holds one.
#[instrument(skip_all)]
pub async fn deals(State(state): State<AppState>, session: Session) -> Result<Json<Vec<DealView>>> {
    let token = SessionStore::get(&session, keys::ADMIN_TOKEN)
        .await
        .map(SecretString::from);
    let api = state.api();
    let (deals, products) = tokio::try_join!(api.deals(token.as_ref()), api.products())?;

    let storage = &state.config().storage_url;
    let views = catalog::join_deals(deals, &products)
        .into_iter()
        .map(|DealListing { deal, product }| DealView {
            id: deal.id,
            title: deal.title,
            description: deal.description,
            product: product.map(|p| ProductView::from_summary(&p, storage)),
        })
        .collect();
    Ok(Json(views))
}
