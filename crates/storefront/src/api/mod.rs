//! Client for the backend REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for users, products, deals, carts and
//!   orders. Nothing is cached here.
//! - Every call is a single round trip: no retries, no timeouts.
//! - Responses are decoded into the typed schemas in [`types`] at this
//!   boundary, so nothing downstream inspects untyped JSON.
//!
//! # Errors
//!
//! - Non-2xx responses become [`ApiError::Status`] carrying the server's
//!   `message` (or `error`) field when the body has one.
//! - Requests that never got a response become [`ApiError::Network`].
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::api::{ApiClient, types::LoginRequest};
//!
//! let api = ApiClient::new(&"http://127.0.0.1:8000/api".parse()?);
//! let auth = api.login(&LoginRequest { email, password }).await?;
//! let me = api.me(&auth.token).await?;
//! ```

pub mod types;

use std::sync::Arc;

use bazaar_core::{CartItemId, CartLine, DealId, ProductId, UserId};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use types::{
    AdminAuthResponse, AuthResponse, Deal, DealInput, LoginRequest, NewProduct, OrderRequest,
    Product, ProductEnvelope, ProductInput, ProductList, RegisterRequest, ServerCartItem,
    SyncRequest, User, UserList,
};

const APPLICATION_JSON: &str = "application/json";

/// Errors returned by backend API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a status outside 200-299.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-supplied message, or a generic one.
        message: String,
    },

    /// No response was obtained (connection refused, reset, DNS, ...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered 2xx with a body that does not match the schema.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status of a [`ApiError::Status`] error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend rejected the bearer token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401))
    }
}

/// Client for the backend REST API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url` (e.g. `http://host/api`).
    #[must_use]
    pub fn new(base_url: &Url) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.as_str().trim_end_matches('/').to_string(),
            }),
        }
    }

    /// The API root this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────────

    /// `POST /login`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    pub async fn login(&self, body: &LoginRequest<'_>) -> Result<AuthResponse, ApiError> {
        self.send_json(Method::POST, "/login", None, body).await
    }

    /// `POST /register`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the registration or the request fails.
    pub async fn register(&self, body: &RegisterRequest<'_>) -> Result<AuthResponse, ApiError> {
        self.send_json(Method::POST, "/register", None, body).await
    }

    /// `POST /admin/login`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    pub async fn admin_login(
        &self,
        body: &LoginRequest<'_>,
    ) -> Result<AdminAuthResponse, ApiError> {
        self.send_json(Method::POST, "/admin/login", None, body).await
    }

    /// `POST /logout` - invalidate the user token server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn logout(&self, token: &SecretString) -> Result<(), ApiError> {
        self.send_empty(Method::POST, "/logout", Some(token)).await
    }

    /// `POST /admin/logout` - invalidate the admin token server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn admin_logout(&self, token: &SecretString) -> Result<(), ApiError> {
        self.send_empty(Method::POST, "/admin/logout", Some(token))
            .await
    }

    /// `GET /me` - the user the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or the request fails.
    pub async fn me(&self, token: &SecretString) -> Result<User, ApiError> {
        self.fetch(Method::GET, "/me", Some(token)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Server cart & orders
    // ─────────────────────────────────────────────────────────────────────────

    /// `GET /cart-items`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn cart_items(&self, token: &SecretString) -> Result<Vec<ServerCartItem>, ApiError> {
        self.fetch(Method::GET, "/cart-items", Some(token)).await
    }

    /// `POST /cart-items/sync` - push local cart lines into the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn sync_cart(&self, token: &SecretString, lines: &[CartLine]) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "/cart-items/sync", Some(token))
            .json(&SyncRequest { items: lines });
        Self::execute(request).await.map(drop)
    }

    /// `DELETE /cart-items/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_cart_item(
        &self,
        token: &SecretString,
        id: CartItemId,
    ) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("/cart-items/{id}"), Some(token))
            .await
    }

    /// `POST /orders` - place an order for one product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_order(
        &self,
        token: &SecretString,
        order: &OrderRequest,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "/orders", Some(token))
            .json(order);
        Self::execute(request).await.map(drop)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────

    /// `GET /products`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn products(&self) -> Result<Vec<Product>, ApiError> {
        let list: ProductList = self.fetch(Method::GET, "/products", None).await?;
        Ok(list.products)
    }

    /// `GET /deals`. The admin token is attached when available.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn deals(&self, token: Option<&SecretString>) -> Result<Vec<Deal>, ApiError> {
        self.fetch(Method::GET, "/deals", token).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────

    /// `POST /products` as multipart form data (the image is optional).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_product(
        &self,
        token: &SecretString,
        product: NewProduct,
    ) -> Result<Product, ApiError> {
        let form = product.into_form()?;
        let request = self
            .request(Method::POST, "/products", Some(token))
            .multipart(form);
        let envelope: ProductEnvelope = Self::decode(Self::execute(request).await?).await?;
        Ok(envelope.product)
    }

    /// `PUT /productupdate/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_product(
        &self,
        token: &SecretString,
        id: ProductId,
        product: &ProductInput,
    ) -> Result<Product, ApiError> {
        let envelope: ProductEnvelope = self
            .send_json(
                Method::PUT,
                &format!("/productupdate/{id}"),
                Some(token),
                product,
            )
            .await?;
        Ok(envelope.product)
    }

    /// `DELETE /productdelete/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_product(&self, token: &SecretString, id: ProductId) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("/productdelete/{id}"), Some(token))
            .await
    }

    /// `POST /deals`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_deal(&self, token: &SecretString, deal: &DealInput) -> Result<Deal, ApiError> {
        self.send_json(Method::POST, "/deals", Some(token), deal)
            .await
    }

    /// `PUT /deals/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_deal(
        &self,
        token: &SecretString,
        id: DealId,
        deal: &DealInput,
    ) -> Result<Deal, ApiError> {
        self.send_json(Method::PUT, &format!("/deals/{id}"), Some(token), deal)
            .await
    }

    /// `DELETE /deals/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_deal(&self, token: &SecretString, id: DealId) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("/deals/{id}"), Some(token))
            .await
    }

    /// `GET /admin/users`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn admin_users(&self, token: &SecretString) -> Result<Vec<User>, ApiError> {
        let list: UserList = self.fetch(Method::GET, "/admin/users", Some(token)).await?;
        Ok(list.users)
    }

    /// `DELETE /admin/users/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_user(&self, token: &SecretString, id: UserId) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("/admin/users/{id}"), Some(token))
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a request with the standard headers and optional bearer token.
    fn request(&self, method: Method, path: &str, token: Option<&SecretString>) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(ACCEPT, APPLICATION_JSON);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        request
    }

    /// Send a request and turn non-2xx statuses into [`ApiError::Status`].
    async fn execute(request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Backend request failed");
            ApiError::Network(e)
        })?;

        let status = response.status();
        tracing::debug!(
            url = %response.url().path(),
            status = status.as_u16(),
            "Backend responded"
        );

        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = server_message(&body)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Bodyless request, typed response.
    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        let request = self
            .request(method, path, token)
            .header(CONTENT_TYPE, APPLICATION_JSON);
        Self::decode(Self::execute(request).await?).await
    }

    /// JSON request, typed response.
    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(method, path, token).json(body);
        Self::decode(Self::execute(request).await?).await
    }

    /// Bodyless request whose response body is ignored.
    async fn send_empty(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
    ) -> Result<(), ApiError> {
        let request = self
            .request(method, path, token)
            .header(CONTENT_TYPE, APPLICATION_JSON);
        Self::execute(request).await.map(drop)
    }
}

/// Extract the human-readable message from an error body.
///
/// Looks at `message` first, then `error`; anything else yields `None`.
fn server_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(String::from)
}
