//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Auth
//! POST /login                  - Customer login (303 /account)
//! POST /register               - Customer registration (201 user)
//! POST /logout                 - Customer logout (303 /login)
//!
//! # Catalog
//! GET  /products               - Product listing (?category=, ?q=)
//! GET  /products/categories    - Products grouped by category
//! GET  /products/{id}          - Product detail
//! GET  /deals                  - Deals with their products
//!
//! # Cart
//! GET    /cart                 - Local cart (anonymous) or server cart (customer)
//! POST   /cart/add             - Add one unit of a product
//! DELETE /cart/items/{id}      - Remove a server cart item (customer)
//! POST   /cart/checkout        - Order every server cart line (customer)
//!
//! # Account (requires customer)
//! GET  /account                - Profile and server cart
//!
//! # Admin (requires admin, except login)
//! POST /admin/login            - Admin login (303 /admin)
//! POST /admin/logout           - Admin logout (303 /login)
//! GET  /admin                  - Dashboard counts
//! GET  /admin/products         - Product table
//! POST /admin/products         - Create product (multipart)
//! PUT  /admin/products/{id}    - Update product
//! DELETE /admin/products/{id}  - Delete product
//! GET  /admin/deals            - Deal table
//! POST /admin/deals            - Create deal
//! PUT  /admin/deals/{id}       - Update deal
//! DELETE /admin/deals/{id}     - Delete deal
//! GET  /admin/users            - User table
//! DELETE /admin/users/{id}     - Delete user
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the customer auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/categories", get(products::categories))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/items/{id}", delete(cart::remove))
        .route("/checkout", post(cart::checkout))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/login", post(auth::admin_login))
        .route("/logout", post(auth::admin_logout))
        .route(
            "/products",
            get(admin::products).post(admin::create_product),
        )
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/deals", get(admin::deals).post(admin::create_deal))
        .route(
            "/deals/{id}",
            put(admin::update_deal).delete(admin::delete_deal),
        )
        .route("/users", get(admin::users))
        .route("/users/{id}", delete(admin::delete_user))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .nest("/products", product_routes())
        .route("/deals", get(products::deals))
        .nest("/cart", cart_routes())
        .route("/account", get(account::index))
        .nest("/admin", admin_routes())
}
