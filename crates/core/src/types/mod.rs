//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;

pub use cart::{CartLine, LocalCart, LocalCartItem, LocalItemId};
pub use id::*;
pub use price::Price;
