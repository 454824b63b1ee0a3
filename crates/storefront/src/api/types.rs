//! Request and response schemas of the backend REST API.
//!
//! Response types are lenient about optional fields the backend may omit or
//! send as `null`, and strict about the fields the client relies on.

use bazaar_core::{CartItemId, CartLine, DealId, Price, ProductId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

// =============================================================================
// Authentication
// =============================================================================

/// Body of `POST /login` and `POST /admin/login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /register`.
#[derive(Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub password_confirmation: &'a str,
}

/// Response of `POST /login` and `POST /register`.
#[derive(Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Response of `POST /admin/login`.
#[derive(Deserialize)]
pub struct AdminAuthResponse {
    pub token: String,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl std::fmt::Debug for AdminAuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuthResponse")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// A backend user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, alias = "phone")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Role marker (e.g. `"admin"`) when the backend sends one.
    #[serde(default)]
    pub role: Option<String>,
}

/// Response of `GET /admin/users`.
#[derive(Debug, Deserialize)]
pub struct UserList {
    pub users: Vec<User>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
    /// Path of the image inside the storage service.
    #[serde(default)]
    pub image: Option<String>,
}

/// Product snapshot embedded in cart items and deals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response of `GET /products`.
#[derive(Debug, Deserialize)]
pub struct ProductList {
    pub products: Vec<Product>,
}

/// Response of product create/update.
#[derive(Debug, Deserialize)]
pub struct ProductEnvelope {
    pub product: Product,
}

/// Editable product fields (`PUT /productupdate/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub stock: u32,
    pub category: String,
}

impl From<&Product> for ProductInput {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product.price,
            stock: product.stock.unwrap_or_default(),
            category: product.category.clone().unwrap_or_default(),
        }
    }
}

/// An uploaded product image.
#[derive(Debug, Clone)]
pub struct ProductImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A product to create (`POST /products`, multipart).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub fields: ProductInput,
    pub image: Option<ProductImage>,
}

impl NewProduct {
    /// Build the multipart form the backend expects.
    ///
    /// # Errors
    ///
    /// Returns an error if the image content type is not a valid MIME type.
    pub fn into_form(self) -> Result<Form, reqwest::Error> {
        let fields = self.fields;
        let mut form = Form::new()
            .text("name", fields.name)
            .text("description", fields.description)
            .text("price", fields.price.amount().to_string())
            .text("stock", fields.stock.to_string())
            .text("category", fields.category);

        if let Some(image) = self.image {
            let mut part = Part::bytes(image.bytes).file_name(image.file_name);
            if let Some(content_type) = image.content_type.as_deref() {
                part = part.mime_str(content_type)?;
            }
            form = form.part("image", part);
        }

        Ok(form)
    }
}

/// A promotional deal attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub product_id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub product: Option<ProductSummary>,
}

/// Editable deal fields (`POST /deals`, `PUT /deals/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealInput {
    pub product_id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

// =============================================================================
// Cart & orders
// =============================================================================

/// One line of the authoritative server cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCartItem {
    pub id: CartItemId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub product: ProductSummary,
}

impl ServerCartItem {
    /// Current product price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Body of `POST /cart-items/sync`.
#[derive(Debug, Serialize)]
pub struct SyncRequest<'a> {
    pub items: &'a [CartLine],
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub quantity: u32,
    pub order_date: NaiveDate,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_accepts_sparse_records() {
        let user: User =
            serde_json::from_str(r#"{"id":3,"name":"Ada","email":"ada@example.com"}"#).unwrap();
        assert_eq!(user.id, UserId::new(3));
        assert!(user.phone_number.is_none());
        assert!(user.created_at.is_none());
    }

    #[test]
    fn test_user_parses_backend_timestamps() {
        let user: User = serde_json::from_str(
            r#"{"id":3,"name":"Ada","email":"ada@example.com","phone_number":null,
                "created_at":"2024-11-02T10:15:00.000000Z"}"#,
        )
        .unwrap();
        assert_eq!(
            user.created_at.map(|t| t.date_naive()),
            NaiveDate::from_ymd_opt(2024, 11, 2)
        );
    }

    #[test]
    fn test_server_cart_item_line_total() {
        let item: ServerCartItem = serde_json::from_str(
            r#"{"id":1,"user_id":3,"product_id":7,"quantity":2,"price":"9.99",
                "product":{"id":7,"name":"Lamp","price":9.99,"image":"lamp.jpg"}}"#,
        )
        .unwrap();
        assert_eq!(item.line_total(), Price::from_cents(1998));
    }

    #[test]
    fn test_auth_response_debug_redacts_token() {
        let response: AuthResponse = serde_json::from_str(
            r#"{"user":{"id":1,"name":"Ada","email":"a@b.c"},"token":"1|supersecret"}"#,
        )
        .unwrap();
        let debug_output = format!("{response:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("supersecret"));
    }

    #[test]
    fn test_order_request_date_format() {
        let order = OrderRequest {
            product_id: ProductId::new(7),
            user_id: UserId::new(3),
            quantity: 2,
            order_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["order_date"], "2026-10-19");
    }
}
