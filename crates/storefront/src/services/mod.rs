//! Client-side business logic.
//!
//! # Services
//!
//! - `auth` - Auth session manager (login, register, logout, admin sessions)
//! - `cart` - Local cart, merge on login, server cart and checkout
//! - `admin` - Admin product, deal and user management
//! - `catalog` - Filtering and grouping of the product list

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
