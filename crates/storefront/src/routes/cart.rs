//! Cart route handlers.
//!
//! Anonymous visitors see and edit the local cart kept in their session.
//! Signed-in customers see the server cart; adding still goes through the
//! local cart, which is merged into the server cart at once.

use axum::{
    Form, Json,
    extract::{Path, State},
};
use bazaar_core::{CartItemId, LocalCart, ProductId};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireCustomer, Visitor};
use crate::services::cart::ServerCart;
use crate::services::catalog;
use crate::state::AppState;

/// Which cart a [`CartView`] shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CartSource {
    Local,
    Server,
}

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: String,
    pub product_id: ProductId,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub source: CartSource,
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    /// View of the anonymous local cart.
    #[must_use]
    pub fn local(cart: &LocalCart) -> Self {
        Self {
            source: CartSource::Local,
            items: cart
                .items()
                .iter()
                .map(|item| CartItemView {
                    id: item.id.to_string(),
                    product_id: item.product_id,
                    name: None,
                    image_url: None,
                    quantity: item.quantity,
                    price: item.price.display(),
                    line_price: item.price.times(item.quantity).display(),
                })
                .collect(),
            subtotal: cart.subtotal().display(),
            item_count: cart.item_count(),
        }
    }

    /// View of the authoritative server cart.
    #[must_use]
    pub fn server(cart: &ServerCart, storage: &Url) -> Self {
        Self {
            source: CartSource::Server,
            items: cart
                .items()
                .iter()
                .map(|item| CartItemView {
                    id: item.id.to_string(),
                    product_id: item.product_id,
                    name: Some(item.product.name.clone()),
                    image_url: item
                        .product
                        .image
                        .as_deref()
                        .map(|path| catalog::image_url(storage, path)),
                    quantity: item.quantity,
                    price: item.product.price.display(),
                    line_price: item.line_total().display(),
                })
                .collect(),
            subtotal: cart.total().display(),
            item_count: cart.item_count(),
        }
    }
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
}

/// Result of an add.
#[derive(Debug, Serialize)]
pub struct AddedView {
    pub product_id: ProductId,
    pub quantity: u32,
    pub merged: bool,
}

/// Result of a checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub orders_placed: usize,
    pub cart: CartView,
}

/// Display the cart.
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, Visitor(auth): Visitor) -> Result<Json<CartView>> {
    if auth.user().is_some() {
        let cart = auth.cart().server_cart().await?;
        return Ok(Json(CartView::server(&cart, &state.config().storage_url)));
    }

    Ok(Json(CartView::local(&auth.cart().local_cart().await)))
}

/// Add one unit of a product.
///
/// The price comes from the catalog, not from the form.
#[instrument(skip(state, auth))]
pub async fn add(
    State(state): State<AppState>,
    Visitor(auth): Visitor,
    Form(form): Form<AddToCartForm>,
) -> Result<Json<AddedView>> {
    let product = catalog::find(state.api().products().await?, form.product_id)
        .ok_or_else(|| AppError::NotFound(format!("product {}", form.product_id)))?;

    let item = auth.cart().add_local(product.id, product.price).await?;
    let product_id = product.id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));

    let mut merged = false;
    if auth.user().is_some()
        && let Some(token) = auth.user_token().await
    {
        merged = auth.cart().merge_on_auth(&token).await? > 0;
    }

    Ok(Json(AddedView {
        product_id: product.id,
        quantity: item.quantity,
        merged,
    }))
}

/// Remove one server cart item.
#[instrument(skip(state, customer))]
pub async fn remove(
    State(state): State<AppState>,
    customer: RequireCustomer,
    Path(id): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let cart_sync = customer.auth.cart();
    let mut cart = cart_sync.server_cart().await?;
    cart_sync.remove_server_item(&mut cart, id).await?;

    Ok(Json(CartView::server(&cart, &state.config().storage_url)))
}

/// Place one order per server cart line.
#[instrument(skip_all, fields(user_id = %customer.user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    customer: RequireCustomer,
) -> Result<Json<CheckoutView>> {
    let cart_sync = customer.auth.cart();
    let mut cart = cart_sync.server_cart().await?;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Your cart is empty".to_string()));
    }

    let orders_placed = cart_sync.checkout(&mut cart, customer.user.id).await?;

    Ok(Json(CheckoutView {
        orders_placed,
        cart: CartView::server(&cart, &state.config().storage_url),
    }))
}
