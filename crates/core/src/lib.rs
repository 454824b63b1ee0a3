//! Bazaar Core - Shared types library.
//!
//! This crate provides common types used across all Bazaar components:
//! - `storefront` - Web client for customers and admins
//! - `cli` - Terminal client driving the same session and cart flows
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no session
//! storage, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, and the anonymous local cart

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
