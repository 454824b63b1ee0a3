//! End-to-end tests through the storefront router.
//!
//! A cookie-keeping client plays the browser; the storefront talks to the
//! mock backend.

#![allow(clippy::unwrap_used)]

use bazaar_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, CUSTOMER_EMAIL, CUSTOMER_ID, CUSTOMER_PASSWORD, LAMP_ID,
    MockBackend, Storefront,
};
use reqwest::{StatusCode, header::LOCATION};
use serde_json::Value;

async fn start() -> (MockBackend, Storefront) {
    let backend = MockBackend::start().await;
    let storefront = Storefront::start(backend.api_url()).await;
    (backend, storefront)
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_health() {
    let (_backend, storefront) = start().await;

    let resp = Storefront::browser()
        .get(storefront.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(resp.text().await.unwrap(), "ok");
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_products_filter_by_category() {
    let (_backend, storefront) = start().await;

    let products: Value = Storefront::browser()
        .get(storefront.url("/products?category=lighting"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let products = products.as_array().unwrap();
    assert_eq!(products.len(), 1);
    let lamp = products.first().unwrap();
    assert_eq!(lamp["id"], LAMP_ID);
    assert_eq!(lamp["price"], "$9.99");
    assert!(
        lamp["image_url"]
            .as_str()
            .unwrap()
            .ends_with("/storage/products/lamp.jpg")
    );
}

#[tokio::test]
async fn test_categories_group_uncategorized_last() {
    let (_backend, storefront) = start().await;

    let groups: Value = Storefront::browser()
        .get(storefront.url("/products/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let names: Vec<&str> = groups
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|g| g["category"].as_str())
        .collect();
    assert_eq!(names, ["Lighting", "Furniture", "uncategorized"]);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let (_backend, storefront) = start().await;

    let resp = Storefront::browser()
        .get(storefront.url("/products/404"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_deals_include_product() {
    let (_backend, storefront) = start().await;

    let deals: Value = Storefront::browser()
        .get(storefront.url("/deals"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let deal = deals.as_array().unwrap().first().unwrap();
    assert_eq!(deal["title"], "Lamp week");
    assert_eq!(deal["product"]["name"], "Desk Lamp");
}

// ============================================================================
// Guard
// ============================================================================

#[tokio::test]
async fn test_anonymous_account_redirects_to_login() {
    let (_backend, storefront) = start().await;

    let resp = Storefront::browser()
        .get(storefront.url("/account"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn test_anonymous_admin_redirects_to_login() {
    let (_backend, storefront) = start().await;

    let resp = Storefront::browser()
        .get(storefront.url("/admin/products"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
}

// ============================================================================
// Shopping flow
// ============================================================================

#[tokio::test]
async fn test_anonymous_cart_merges_on_login() {
    let (backend, storefront) = start().await;
    let browser = Storefront::browser();

    for _ in 0..2 {
        let resp = browser
            .post(storefront.url("/cart/add"))
            .form(&[("product_id", LAMP_ID.to_string())])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let cart: Value = browser
        .get(storefront.url("/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["source"], "local");
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["subtotal"], "$19.98");
    assert!(backend.syncs().is_empty());

    let resp = browser
        .post(storefront.url("/login"))
        .form(&[("email", CUSTOMER_EMAIL), ("password", CUSTOMER_PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/account");
    assert_eq!(backend.syncs(), vec![vec![(LAMP_ID, 2)]]);

    let account: Value = browser
        .get(storefront.url("/account"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(account["profile"]["email"], CUSTOMER_EMAIL);
    assert_eq!(account["profile"]["member_since"], "March 2024");
    assert_eq!(account["cart"]["source"], "server");
    assert_eq!(account["cart"]["items"][0]["quantity"], 2);
    assert_eq!(account["cart"]["items"][0]["name"], "Desk Lamp");

    let checkout: Value = browser
        .post(storefront.url("/cart/checkout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(checkout["orders_placed"], 1);
    assert_eq!(checkout["cart"]["item_count"], 0);
    assert_eq!(backend.orders().len(), 1);
    assert!(backend.cart_of(CUSTOMER_ID).is_empty());
}

#[tokio::test]
async fn test_add_while_signed_in_goes_to_server_cart() {
    let (backend, storefront) = start().await;
    let browser = Storefront::browser();

    browser
        .post(storefront.url("/login"))
        .form(&[("email", CUSTOMER_EMAIL), ("password", CUSTOMER_PASSWORD)])
        .send()
        .await
        .unwrap();

    let added: Value = browser
        .post(storefront.url("/cart/add"))
        .form(&[("product_id", LAMP_ID.to_string())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(added["merged"], true);
    assert_eq!(backend.cart_of(CUSTOMER_ID).len(), 1);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let (_backend, storefront) = start().await;

    let resp = Storefront::browser()
        .post(storefront.url("/login"))
        .form(&[("email", CUSTOMER_EMAIL), ("password", "wrong")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_register_mismatch_is_bad_request() {
    let (backend, storefront) = start().await;

    let resp = Storefront::browser()
        .post(storefront.url("/register"))
        .form(&[
            ("name", "Alan"),
            ("email", "alan@example.com"),
            ("password", "enigma42"),
            ("password_confirmation", "enigma43"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Passwords do not match");
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_logout_ends_session() {
    let (_backend, storefront) = start().await;
    let browser = Storefront::browser();

    browser
        .post(storefront.url("/login"))
        .form(&[("email", CUSTOMER_EMAIL), ("password", CUSTOMER_PASSWORD)])
        .send()
        .await
        .unwrap();

    let resp = browser
        .post(storefront.url("/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let resp = browser
        .get(storefront.url("/account"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

// ============================================================================
// Admin flow
// ============================================================================

#[tokio::test]
async fn test_admin_login_then_dashboard() {
    let (backend, storefront) = start().await;
    let browser = Storefront::browser();

    let resp = browser
        .post(storefront.url("/admin/login"))
        .form(&[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin");

    let counts: Value = browser
        .get(storefront.url("/admin"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(counts["products"], 3);
    assert_eq!(counts["users"], 2);

    // An expired admin token ends the admin session
    backend.revoke_admin_tokens();
    let resp = browser
        .get(storefront.url("/admin/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = browser
        .get(storefront.url("/admin/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_admin_delete_product_returns_table() {
    let (_backend, storefront) = start().await;
    let browser = Storefront::browser();

    browser
        .post(storefront.url("/admin/login"))
        .form(&[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)])
        .send()
        .await
        .unwrap();

    let table: Value = browser
        .delete(storefront.url(&format!("/admin/products/{LAMP_ID}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let rows = table.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["state"] == "confirmed"));
    assert!(rows.iter().all(|r| r["record"]["id"] != LAMP_ID));
}
