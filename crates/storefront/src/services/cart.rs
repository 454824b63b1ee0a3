//! Cart synchronization.
//!
//! Anonymous visitors keep their cart in client storage (see
//! [`bazaar_core::LocalCart`]). Once a session exists the backend cart is
//! authoritative, and the local cart is pushed into it exactly once, right
//! after login or registration. The local copy is deleted only after the
//! backend accepted it, so a failed merge can be retried by logging in again.

use bazaar_core::{CartItemId, LocalCart, LocalCartItem, Price, ProductId, UserId};
use chrono::Utc;
use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use crate::api::types::{OrderRequest, ServerCartItem};
use crate::api::{ApiClient, ApiError};
use crate::storage::{SessionStore, keys};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The operation needs a signed-in user.
    #[error("sign in to manage your cart")]
    NotAuthenticated,

    /// The item is not in the cart.
    #[error("cart item {0} not found")]
    ItemNotFound(CartItemId),

    /// The local cart could not be encoded for storage.
    #[error("could not store cart: {0}")]
    Encode(#[from] serde_json::Error),

    /// The backend rejected the request or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The authoritative cart of a signed-in user, as last fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerCart {
    items: Vec<ServerCartItem>,
}

impl ServerCart {
    #[must_use]
    pub const fn new(items: Vec<ServerCartItem>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[ServerCartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of current product price times quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(ServerCartItem::line_total).sum()
    }

    #[must_use]
    pub fn contains(&self, id: CartItemId) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    fn remove(&mut self, id: CartItemId) -> Option<ServerCartItem> {
        let index = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(index))
    }
}

/// Local and server cart operations for one client.
#[derive(Clone)]
pub struct CartSync<S> {
    api: ApiClient,
    store: S,
}

impl<S: SessionStore> CartSync<S> {
    /// Create a synchronizer over the client's storage.
    #[must_use]
    pub const fn new(api: ApiClient, store: S) -> Self {
        Self { api, store }
    }

    // =========================================================================
    // Local cart
    // =========================================================================

    /// Read the local cart. A missing or unreadable value reads as empty.
    pub async fn local_cart(&self) -> LocalCart {
        let Some(raw) = self.store.get(keys::CART_ITEMS).await else {
            return LocalCart::default();
        };

        LocalCart::from_json(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable local cart");
            LocalCart::default()
        })
    }

    /// Add one unit of a product to the local cart.
    ///
    /// Read-modify-write of the whole list; concurrent adds race and the
    /// last write wins.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Encode` if the cart cannot be serialized.
    #[instrument(skip(self))]
    pub async fn add_local(
        &self,
        product_id: ProductId,
        price: Price,
    ) -> Result<LocalCartItem, CartError> {
        let mut cart = self.local_cart().await;
        let item = cart.add(product_id, price);
        self.store.set(keys::CART_ITEMS, cart.to_json()?).await;

        tracing::debug!(quantity = item.quantity, "Added to local cart");
        Ok(item)
    }

    /// Delete the local cart.
    pub async fn clear_local(&self) {
        self.store.remove(keys::CART_ITEMS).await;
    }

    /// Push the local cart into the server cart.
    ///
    /// An empty local cart is a no-op and makes no request. On success the
    /// local cart is deleted; on failure it is left untouched so the merge can
    /// be retried. Returns the number of lines sent.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the sync request fails.
    #[instrument(skip(self, token))]
    pub async fn merge_on_auth(&self, token: &SecretString) -> Result<usize, CartError> {
        let cart = self.local_cart().await;
        if cart.is_empty() {
            return Ok(0);
        }

        let lines = cart.lines();
        self.api.sync_cart(token, &lines).await?;
        self.clear_local().await;

        tracing::info!(lines = lines.len(), "Merged local cart into server cart");
        Ok(lines.len())
    }

    // =========================================================================
    // Server cart
    // =========================================================================

    /// Fetch the signed-in user's server cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotAuthenticated` without a user token, or
    /// `CartError::Api` if the request fails.
    #[instrument(skip(self))]
    pub async fn server_cart(&self) -> Result<ServerCart, CartError> {
        let token = self.user_token().await?;
        let items = self.api.cart_items(&token).await?;
        Ok(ServerCart::new(items))
    }

    /// Delete one server cart item and drop it from `cart`.
    ///
    /// On failure `cart` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotAuthenticated` without a user token,
    /// `CartError::ItemNotFound` if `cart` has no such item, or
    /// `CartError::Api` if the request fails.
    #[instrument(skip(self, cart))]
    pub async fn remove_server_item(
        &self,
        cart: &mut ServerCart,
        id: CartItemId,
    ) -> Result<(), CartError> {
        let token = self.user_token().await?;
        if !cart.contains(id) {
            return Err(CartError::ItemNotFound(id));
        }

        self.api.delete_cart_item(&token, id).await?;
        cart.remove(id);
        Ok(())
    }

    /// Place one order per server cart line, then empty the server cart.
    ///
    /// Orders are placed first; the first failing order aborts checkout
    /// with `cart` unchanged. Lines are then removed one by one. Returns the
    /// number of orders placed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotAuthenticated` without a user token, or
    /// `CartError::Api` if an order or a removal fails.
    #[instrument(skip(self, cart))]
    pub async fn checkout(&self, cart: &mut ServerCart, user_id: UserId) -> Result<usize, CartError> {
        let token = self.user_token().await?;
        let order_date = Utc::now().date_naive();

        for item in cart.items() {
            let order = OrderRequest {
                product_id: item.product_id,
                user_id: item.user_id.unwrap_or(user_id),
                quantity: item.quantity,
                order_date,
            };
            self.api.create_order(&token, &order).await?;
        }

        let placed = cart.items().len();
        let ids: Vec<_> = cart.items().iter().map(|i| i.id).collect();
        for id in ids {
            self.api.delete_cart_item(&token, id).await?;
            cart.remove(id);
        }

        tracing::info!(orders = placed, "Checkout complete");
        Ok(placed)
    }

    async fn user_token(&self) -> Result<SecretString, CartError> {
        self.store
            .get(keys::USER_TOKEN)
            .await
            .map(SecretString::from)
            .ok_or(CartError::NotAuthenticated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn offline_sync(store: InMemoryStore) -> CartSync<InMemoryStore> {
        // Nothing listens on port 9; the tests below never reach the network.
        let api = ApiClient::new(&"http://127.0.0.1:9/api".parse().unwrap());
        CartSync::new(api, store)
    }

    #[tokio::test]
    async fn test_add_local_twice_keeps_one_entry() {
        let store = InMemoryStore::new();
        let sync = offline_sync(store.clone());

        sync.add_local(ProductId::new(7), Price::from_cents(999))
            .await
            .unwrap();
        let item = sync
            .add_local(ProductId::new(7), Price::from_cents(999))
            .await
            .unwrap();

        assert_eq!(item.quantity, 2);
        let stored = LocalCart::from_json(&store.peek(keys::CART_ITEMS).unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_local_cart_reads_as_empty() {
        let store = InMemoryStore::with_entries([(keys::CART_ITEMS, "not json")]);
        let sync = offline_sync(store);

        assert!(sync.local_cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_merge_with_empty_cart_is_a_no_op() {
        let store = InMemoryStore::with_entries([(keys::USER_TOKEN, "t")]);
        let sync = offline_sync(store.clone());
        let before = store.snapshot();

        let merged = sync
            .merge_on_auth(&SecretString::from("t"))
            .await
            .unwrap();

        assert_eq!(merged, 0);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_server_operations_require_token() {
        let sync = offline_sync(InMemoryStore::new());
        let mut cart = ServerCart::default();

        assert!(matches!(
            sync.server_cart().await,
            Err(CartError::NotAuthenticated)
        ));
        assert!(matches!(
            sync.remove_server_item(&mut cart, CartItemId::new(1)).await,
            Err(CartError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_remove_unknown_item_is_rejected_locally() {
        let sync = offline_sync(InMemoryStore::with_entries([(keys::USER_TOKEN, "t")]));
        let mut cart = ServerCart::default();

        assert!(matches!(
            sync.remove_server_item(&mut cart, CartItemId::new(5)).await,
            Err(CartError::ItemNotFound(_))
        ));
    }
}
