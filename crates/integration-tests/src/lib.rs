//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! Nothing external is needed: [`MockBackend`] serves the backend REST API
//! in-process on a random port, and [`Storefront`] serves the real storefront
//! router against it.
//!
//! # Test Categories
//!
//! - `auth_session` - Sign-in, sign-out and token restoration
//! - `cart_sync` - Local cart merge, server cart and checkout
//! - `admin` - Admin tables and admin token rejection
//! - `storefront_routes` - End-to-end browser flows through the storefront

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Multipart, Path, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use bazaar_storefront::api::ApiClient;
use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::state::AppState;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

/// Seeded customer.
pub const CUSTOMER_ID: i64 = 1;
pub const CUSTOMER_EMAIL: &str = "ada@example.com";
pub const CUSTOMER_PASSWORD: &str = "correct-horse";
pub const CUSTOMER_TOKEN: &str = "user-token-1";

/// Seeded administrator.
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const ADMIN_TOKEN: &str = "admin-token-1";

/// Seeded product priced 9.99.
pub const LAMP_ID: i64 = 7;
/// Seeded product priced 49.50.
pub const CHAIR_ID: i64 = 8;

/// One request the mock backend received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path below the API root, e.g. `/cart-items/sync`.
    pub path: String,
    pub bearer: Option<String>,
}

/// Endpoint groups that can be forced to answer 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Me,
    Logout,
    Sync,
    Orders,
    AdminWrites,
}

/// A server cart row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartRow {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: u32,
}

struct MockUser {
    id: i64,
    name: String,
    email: String,
    password: String,
}

impl MockUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "phone_number": null,
            "created_at": "2024-03-05T10:00:00.000000Z",
        })
    }
}

struct MockState {
    requests: Vec<RecordedRequest>,
    failures: Vec<Failure>,
    users: Vec<MockUser>,
    user_tokens: HashMap<String, i64>,
    admin_tokens: Vec<String>,
    products: Vec<Value>,
    deals: Vec<Value>,
    cart: Vec<CartRow>,
    syncs: Vec<Vec<(i64, u32)>>,
    orders: Vec<Value>,
    next_id: i64,
}

impl MockState {
    fn seeded() -> Self {
        Self {
            requests: Vec::new(),
            failures: Vec::new(),
            users: vec![
                MockUser {
                    id: CUSTOMER_ID,
                    name: "Ada Lovelace".to_string(),
                    email: CUSTOMER_EMAIL.to_string(),
                    password: CUSTOMER_PASSWORD.to_string(),
                },
                MockUser {
                    id: 2,
                    name: "Grace Hopper".to_string(),
                    email: "grace@example.com".to_string(),
                    password: "cobol".to_string(),
                },
            ],
            user_tokens: HashMap::new(),
            admin_tokens: Vec::new(),
            products: vec![
                json!({"id": LAMP_ID, "name": "Desk Lamp", "description": "Warm reading light",
                       "price": "9.99", "stock": 12, "category": "Lighting", "image": "products/lamp.jpg"}),
                json!({"id": CHAIR_ID, "name": "Oak Chair", "description": "Solid oak",
                       "price": "49.50", "stock": 3, "category": "Furniture", "image": null}),
                json!({"id": 9, "name": "Throw Pillow", "description": null,
                       "price": "15.00", "stock": 40, "category": null, "image": null}),
            ],
            deals: vec![json!({"id": 1, "product_id": LAMP_ID, "title": "Lamp week",
                               "description": "20% off lamps"})],
            cart: Vec::new(),
            syncs: Vec::new(),
            orders: Vec::new(),
            next_id: 100,
        }
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn failing(&self, failure: Failure) -> bool {
        self.failures.contains(&failure)
    }

    fn product(&self, id: i64) -> Option<&Value> {
        self.products.iter().find(|p| p["id"] == id)
    }

    fn cart_json(&self, user_id: i64) -> Vec<Value> {
        self.cart
            .iter()
            .filter(|row| row.user_id == user_id)
            .filter_map(|row| {
                let product = self.product(row.product_id)?;
                Some(json!({
                    "id": row.id,
                    "user_id": row.user_id,
                    "product_id": row.product_id,
                    "quantity": row.quantity,
                    "price": product["price"],
                    "product": product,
                }))
            })
            .collect()
    }
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process mock of the backend REST API.
///
/// Stops serving when dropped.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Start a mock backend with the seeded users and catalog.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::seeded()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");

        let app = mock_router(state.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// API root, e.g. `http://127.0.0.1:41234/api`.
    pub fn api_url(&self) -> Url {
        format!("http://{}/api", self.addr)
            .parse()
            .expect("Invalid mock URL")
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.api_url())
    }

    /// Force an endpoint group to answer 500.
    pub fn fail(&self, failure: Failure) {
        lock(&self.state).failures.push(failure);
    }

    /// Undo [`Self::fail`].
    pub fn recover(&self, failure: Failure) {
        lock(&self.state).failures.retain(|f| *f != failure);
    }

    /// Invalidate every admin token, as if they expired.
    pub fn revoke_admin_tokens(&self) {
        lock(&self.state).admin_tokens.clear();
    }

    /// Register a valid user token without going through login.
    pub fn issue_user_token(&self, token: &str, user_id: i64) {
        lock(&self.state)
            .user_tokens
            .insert(token.to_string(), user_id);
    }

    /// Register a valid admin token without going through login.
    pub fn issue_admin_token(&self, token: &str) {
        lock(&self.state).admin_tokens.push(token.to_string());
    }

    /// Whether a user token is still accepted.
    pub fn user_token_valid(&self, token: &str) -> bool {
        lock(&self.state).user_tokens.contains_key(token)
    }

    /// Put a line into a user's server cart; returns the cart item id.
    pub fn seed_cart(&self, user_id: i64, product_id: i64, quantity: u32) -> i64 {
        let mut state = lock(&self.state);
        let id = state.next_id();
        state.cart.push(CartRow {
            id,
            user_id,
            product_id,
            quantity,
        });
        id
    }

    pub fn cart_of(&self, user_id: i64) -> Vec<CartRow> {
        lock(&self.state)
            .cart
            .iter()
            .filter(|row| row.user_id == user_id)
            .copied()
            .collect()
    }

    /// Bodies of every sync call, as `(product_id, quantity)` lines.
    pub fn syncs(&self) -> Vec<Vec<(i64, u32)>> {
        lock(&self.state).syncs.clone()
    }

    pub fn orders(&self) -> Vec<Value> {
        lock(&self.state).orders.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Number of requests received for `method` and `path`.
    pub fn count(&self, method: &str, path: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A client for an API root where nothing listens.
pub async fn unreachable_api() -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No address");
    drop(listener);

    let url: Url = format!("http://{addr}/api").parse().expect("Invalid URL");
    ApiClient::new(&url)
}

/// The storefront router served on a random port.
pub struct Storefront {
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl Storefront {
    /// Serve the storefront against `api_url`.
    pub async fn start(api_url: Url) -> Self {
        let app = bazaar_storefront::app(AppState::new(StorefrontConfig::local(api_url)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind storefront");
        let addr = listener.local_addr().expect("Storefront has no address");

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, server }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// A browser: keeps cookies and does not follow redirects.
    pub fn browser() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }
}

impl Drop for Storefront {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Mock routes
// =============================================================================

fn mock_router(state: Shared) -> Router {
    let api = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/admin/login", post(admin_login))
        .route("/admin/logout", post(admin_logout))
        .route("/cart-items", get(cart_items))
        .route("/cart-items/sync", post(sync_cart))
        .route("/cart-items/{id}", delete(delete_cart_item))
        .route("/orders", post(create_order))
        .route("/products", get(products).post(create_product))
        .route("/productupdate/{id}", put(update_product))
        .route("/productdelete/{id}", delete(delete_product))
        .route("/deals", get(deals).post(create_deal))
        .route("/deals/{id}", put(update_deal).delete(delete_deal))
        .route("/admin/users", get(admin_users))
        .route("/admin/users/{id}", delete(delete_user));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request
            .uri()
            .path()
            .trim_start_matches("/api")
            .to_string(),
        bearer: bearer(request.headers()),
    };
    lock(&state).requests.push(recorded);
    next.run(request).await
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(String::from)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn unauthenticated() -> Response {
    error(StatusCode::UNAUTHORIZED, "Unauthenticated.")
}

fn server_error() -> Response {
    error(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
}

fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "Not found")
}

fn user_id(state: &MockState, headers: &HeaderMap) -> Option<i64> {
    state.user_tokens.get(&bearer(headers)?).copied()
}

fn is_admin(state: &MockState, headers: &HeaderMap) -> bool {
    bearer(headers).is_some_and(|t| state.admin_tokens.contains(&t))
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct Registration {
    name: String,
    email: String,
    password: String,
    password_confirmation: String,
}

#[derive(Deserialize)]
struct SyncBody {
    items: Vec<SyncLine>,
}

#[derive(Deserialize)]
struct SyncLine {
    product_id: i64,
    quantity: u32,
}

async fn login(State(state): State<Shared>, Json(body): Json<Credentials>) -> Response {
    let mut state = lock(&state);
    let Some(user) = state
        .users
        .iter()
        .find(|u| u.email == body.email && u.password == body.password)
    else {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };

    let (id, user) = (user.id, user.to_json());
    let token = format!("user-token-{id}");
    state.user_tokens.insert(token.clone(), id);
    Json(json!({ "user": user, "token": token })).into_response()
}

async fn register(State(state): State<Shared>, Json(body): Json<Registration>) -> Response {
    let mut state = lock(&state);
    if body.password != body.password_confirmation {
        return error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "The password field confirmation does not match.",
        );
    }
    if state.users.iter().any(|u| u.email == body.email) {
        return error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "The email has already been taken.",
        );
    }

    let id = state.next_id();
    let user = MockUser {
        id,
        name: body.name,
        email: body.email,
        password: body.password,
    };
    let json = user.to_json();
    state.users.push(user);

    let token = format!("user-token-{id}");
    state.user_tokens.insert(token.clone(), id);
    (
        StatusCode::CREATED,
        Json(json!({ "user": json, "token": token })),
    )
        .into_response()
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    if state.failing(Failure::Logout) {
        return server_error();
    }
    let Some(token) = bearer(&headers).filter(|t| state.user_tokens.contains_key(t)) else {
        return unauthenticated();
    };
    state.user_tokens.remove(&token);
    Json(json!({ "message": "Logged out" })).into_response()
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    if state.failing(Failure::Me) {
        return server_error();
    }
    let Some(id) = user_id(&state, &headers) else {
        return unauthenticated();
    };
    state
        .users
        .iter()
        .find(|u| u.id == id)
        .map_or_else(unauthenticated, |u| Json(u.to_json()).into_response())
}

async fn admin_login(State(state): State<Shared>, Json(body): Json<Credentials>) -> Response {
    if body.email != ADMIN_EMAIL || body.password != ADMIN_PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    let mut state = lock(&state);
    if !state.admin_tokens.iter().any(|t| t == ADMIN_TOKEN) {
        state.admin_tokens.push(ADMIN_TOKEN.to_string());
    }
    Json(json!({ "token": ADMIN_TOKEN })).into_response()
}

async fn admin_logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    let Some(token) = bearer(&headers) else {
        return unauthenticated();
    };
    state.admin_tokens.retain(|t| *t != token);
    Json(json!({ "message": "Logged out" })).into_response()
}

async fn cart_items(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let Some(id) = user_id(&state, &headers) else {
        return unauthenticated();
    };
    Json(state.cart_json(id)).into_response()
}

async fn sync_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<SyncBody>,
) -> Response {
    let mut state = lock(&state);
    if state.failing(Failure::Sync) {
        return server_error();
    }
    let Some(user_id) = user_id(&state, &headers) else {
        return unauthenticated();
    };

    state
        .syncs
        .push(body.items.iter().map(|l| (l.product_id, l.quantity)).collect());

    // Upsert by product
    for line in body.items {
        if let Some(row) = state
            .cart
            .iter_mut()
            .find(|row| row.user_id == user_id && row.product_id == line.product_id)
        {
            row.quantity += line.quantity;
            continue;
        }
        let id = state.next_id();
        state.cart.push(CartRow {
            id,
            user_id,
            product_id: line.product_id,
            quantity: line.quantity,
        });
    }

    Json(state.cart_json(user_id)).into_response()
}

async fn delete_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut state = lock(&state);
    let Some(user_id) = user_id(&state, &headers) else {
        return unauthenticated();
    };
    let before = state.cart.len();
    state
        .cart
        .retain(|row| !(row.id == id && row.user_id == user_id));
    if state.cart.len() == before {
        return not_found();
    }
    Json(json!({ "message": "Item removed" })).into_response()
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if user_id(&state, &headers).is_none() {
        return unauthenticated();
    }
    if state.failing(Failure::Orders) {
        return server_error();
    }
    state.orders.push(body.clone());
    (StatusCode::CREATED, Json(json!({ "order": body }))).into_response()
}

async fn products(State(state): State<Shared>) -> Response {
    Json(json!({ "products": lock(&state).products })).into_response()
}

async fn deals(State(state): State<Shared>) -> Response {
    let state = lock(&state);
    let deals: Vec<Value> = state
        .deals
        .iter()
        .map(|deal| {
            let mut deal = deal.clone();
            if let Some(product) = deal["product_id"]
                .as_i64()
                .and_then(|id| state.product(id))
            {
                deal["product"] = product.clone();
            }
            deal
        })
        .collect();
    Json(deals).into_response()
}

/// Admin guard shared by the admin mutation handlers.
fn admin_write(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    if !is_admin(state, headers) {
        return Err(unauthenticated());
    }
    if state.failing(Failure::AdminWrites) {
        return Err(server_error());
    }
    Ok(())
}

async fn create_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut fields = HashMap::new();
    let mut image = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            image = field.file_name().map(|f| format!("products/{f}"));
        } else if let Ok(text) = field.text().await {
            fields.insert(name, text);
        }
    }

    let mut state = lock(&state);
    if let Err(response) = admin_write(&state, &headers) {
        return response;
    }

    let id = state.next_id();
    let text = |key: &str| fields.get(key).cloned().unwrap_or_default();
    let product = json!({
        "id": id,
        "name": text("name"),
        "description": text("description"),
        "price": text("price"),
        "stock": text("stock").parse::<u32>().unwrap_or_default(),
        "category": text("category"),
        "image": image,
    });
    state.products.push(product.clone());
    (StatusCode::CREATED, Json(json!({ "product": product }))).into_response()
}

async fn update_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = admin_write(&state, &headers) {
        return response;
    }
    let Some(product) = state.products.iter_mut().find(|p| p["id"] == id) else {
        return not_found();
    };
    for key in ["name", "description", "price", "stock", "category"] {
        if let Some(value) = body.get(key) {
            product[key] = value.clone();
        }
    }
    Json(json!({ "product": product })).into_response()
}

async fn delete_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = admin_write(&state, &headers) {
        return response;
    }
    let before = state.products.len();
    state.products.retain(|p| p["id"] != id);
    if state.products.len() == before {
        return not_found();
    }
    Json(json!({ "message": "Product deleted" })).into_response()
}

async fn create_deal(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = admin_write(&state, &headers) {
        return response;
    }
    let id = state.next_id();
    let deal = json!({
        "id": id,
        "product_id": body["product_id"],
        "title": body["title"],
        "description": body["description"],
    });
    state.deals.push(deal.clone());
    (StatusCode::CREATED, Json(deal)).into_response()
}

async fn update_deal(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = admin_write(&state, &headers) {
        return response;
    }
    let Some(deal) = state.deals.iter_mut().find(|d| d["id"] == id) else {
        return not_found();
    };
    for key in ["product_id", "title", "description"] {
        if let Some(value) = body.get(key) {
            deal[key] = value.clone();
        }
    }
    Json(deal.clone()).into_response()
}

async fn delete_deal(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = admin_write(&state, &headers) {
        return response;
    }
    let before = state.deals.len();
    state.deals.retain(|d| d["id"] != id);
    if state.deals.len() == before {
        return not_found();
    }
    Json(json!({ "message": "Deal deleted" })).into_response()
}

async fn admin_users(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    if !is_admin(&state, &headers) {
        return unauthenticated();
    }
    let users: Vec<Value> = state.users.iter().map(MockUser::to_json).collect();
    Json(json!({ "users": users })).into_response()
}

async fn delete_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = admin_write(&state, &headers) {
        return response;
    }
    let before = state.users.len();
    state.users.retain(|u| u.id != id);
    if state.users.len() == before {
        return not_found();
    }
    Json(json!({ "message": "User deleted" })).into_response()
}
