//! The anonymous local cart.
//!
//! Before a visitor signs in, their cart lives entirely in client storage as a
//! JSON list. The list holds at most one entry per product; adding a product
//! that is already present bumps its quantity instead of appending.
//!
//! # Example
//!
//! ```rust
//! use bazaar_core::{LocalCart, Price, ProductId};
//!
//! let mut cart = LocalCart::default();
//! cart.add(ProductId::new(7), Price::from_cents(999));
//! cart.add(ProductId::new(7), Price::from_cents(999));
//!
//! assert_eq!(cart.len(), 1);
//! assert_eq!(cart.items()[0].quantity, 2);
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Price, ProductId};

/// Client-generated identifier for a local cart entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalItemId(Uuid);

impl LocalItemId {
    /// Generate a fresh random ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for LocalItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One entry of the local cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCartItem {
    pub id: LocalItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price captured when the product was first added.
    pub price: Price,
}

/// A product/quantity pair sent to the backend when merging carts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// The ordered local cart list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalCart {
    items: Vec<LocalCartItem>,
}

impl LocalCart {
    /// Parse a cart from its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is not a JSON list of cart items.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Serialize the cart to the JSON form kept in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Add one unit of a product.
    ///
    /// Increments the existing entry for `product_id` if there is one,
    /// otherwise appends a new entry with quantity 1 at `price`.
    pub fn add(&mut self, product_id: ProductId, price: Price) -> LocalCartItem {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = item.quantity.saturating_add(1);
            return item.clone();
        }

        let item = LocalCartItem {
            id: LocalItemId::generate(),
            product_id,
            quantity: 1,
            price,
        };
        self.items.push(item.clone());
        item
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LocalCartItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all entries.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(|i| i.price.times(i.quantity)).sum()
    }

    /// The product/quantity lines sent to the sync endpoint.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.items
            .iter()
            .map(|i| CartLine {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect()
    }
}
