//! Admin route handlers.
//!
//! Every handler requires the admin session and answers with the affected
//! table, so the client sees each row's state after the mutation.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Multipart, Path, multipart::Field},
    http::StatusCode,
};
use bazaar_core::{DealId, Price, ProductId, UserId};
use tracing::instrument;

use crate::api::types::{Deal, DealInput, NewProduct, Product, ProductImage, ProductInput, User};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::admin::{AdminConsole, AdminTable, DashboardCounts};

// =============================================================================
// Dashboard
// =============================================================================

/// Record counts for the dashboard.
#[instrument(skip_all)]
pub async fn dashboard(RequireAdmin(mut auth): RequireAdmin) -> Result<Json<DashboardCounts>> {
    let counts = AdminConsole::new(&mut auth).dashboard().await?;
    Ok(Json(counts))
}

// =============================================================================
// Products
// =============================================================================

#[instrument(skip_all)]
pub async fn products(RequireAdmin(mut auth): RequireAdmin) -> Result<Json<AdminTable<Product>>> {
    let table = AdminConsole::new(&mut auth).products().await?;
    Ok(Json(table))
}

/// Create a product from a multipart form (`name`, `description`, `price`,
/// `stock`, `category`, optional `image` file).
#[instrument(skip_all)]
pub async fn create_product(
    RequireAdmin(mut auth): RequireAdmin,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AdminTable<Product>>)> {
    let product = read_new_product(multipart).await?;

    let mut console = AdminConsole::new(&mut auth);
    let mut table = console.products().await?;
    console.create_product(&mut table, product).await?;
    Ok((StatusCode::CREATED, Json(table)))
}

#[instrument(skip(auth, input))]
pub async fn update_product(
    RequireAdmin(mut auth): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<AdminTable<Product>>> {
    let mut console = AdminConsole::new(&mut auth);
    let mut table = console.products().await?;
    console.update_product(&mut table, id, &input).await?;
    Ok(Json(table))
}

#[instrument(skip(auth))]
pub async fn delete_product(
    RequireAdmin(mut auth): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<AdminTable<Product>>> {
    let mut console = AdminConsole::new(&mut auth);
    let mut table = console.products().await?;
    console.delete_product(&mut table, id).await?;
    Ok(Json(table))
}

// =============================================================================
// Deals
// =============================================================================

#[instrument(skip_all)]
pub async fn deals(RequireAdmin(mut auth): RequireAdmin) -> Result<Json<AdminTable<Deal>>> {
    let table = AdminConsole::new(&mut auth).deals().await?;
    Ok(Json(table))
}

#[instrument(skip(auth, input))]
pub async fn create_deal(
    RequireAdmin(mut auth): RequireAdmin,
    Json(input): Json<DealInput>,
) -> Result<(StatusCode, Json<AdminTable<Deal>>)> {
    let mut console = AdminConsole::new(&mut auth);
    let mut table = console.deals().await?;
    console.create_deal(&mut table, &input).await?;
    Ok((StatusCode::CREATED, Json(table)))
}

#[instrument(skip(auth, input))]
pub async fn update_deal(
    RequireAdmin(mut auth): RequireAdmin,
    Path(id): Path<DealId>,
    Json(input): Json<DealInput>,
) -> Result<Json<AdminTable<Deal>>> {
    let mut console = AdminConsole::new(&mut auth);
    let mut table = console.deals().await?;
    console.update_deal(&mut table, id, &input).await?;
    Ok(Json(table))
}

#[instrument(skip(auth))]
pub async fn delete_deal(
    RequireAdmin(mut auth): RequireAdmin,
    Path(id): Path<DealId>,
) -> Result<Json<AdminTable<Deal>>> {
    let mut console = AdminConsole::new(&mut auth);
    let mut table = console.deals().await?;
    console.delete_deal(&mut table, id).await?;
    Ok(Json(table))
}

// =============================================================================
// Users
// =============================================================================

#[instrument(skip_all)]
pub async fn users(RequireAdmin(mut auth): RequireAdmin) -> Result<Json<AdminTable<User>>> {
    let table = AdminConsole::new(&mut auth).users().await?;
    Ok(Json(table))
}

#[instrument(skip(auth))]
pub async fn delete_user(
    RequireAdmin(mut auth): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<AdminTable<User>>> {
    let mut console = AdminConsole::new(&mut auth);
    let mut table = console.users().await?;
    console.delete_user(&mut table, id).await?;
    Ok(Json(table))
}

// =============================================================================
// Multipart
// =============================================================================

fn bad_request(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(e.to_string())
}

async fn text(field: Field<'_>) -> Result<String> {
    Ok(field.text().await.map_err(bad_request)?.trim().to_string())
}

/// Read the product creation form.
async fn read_new_product(mut multipart: Multipart) -> Result<NewProduct> {
    let mut name = String::new();
    let mut description = String::new();
    let mut price = None;
    let mut stock = 0;
    let mut category = String::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = text(field).await?,
            "description" => description = text(field).await?,
            "price" => price = Some(Price::from_str(&text(field).await?).map_err(bad_request)?),
            "stock" => {
                let raw = text(field).await?;
                if !raw.is_empty() {
                    stock = raw.parse().map_err(bad_request)?;
                }
            }
            "category" => category = text(field).await?,
            "image" => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().map(String::from);
                let bytes = field.bytes().await.map_err(bad_request)?;
                if !bytes.is_empty() {
                    image = Some(ProductImage {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    if name.is_empty() {
        return Err(AppError::BadRequest("Product name is required".to_string()));
    }
    let price = price.ok_or_else(|| AppError::BadRequest("Price is required".to_string()))?;

    Ok(NewProduct {
        fields: ProductInput {
            name,
            description,
            price,
            stock,
            category,
        },
        image,
    })
}
