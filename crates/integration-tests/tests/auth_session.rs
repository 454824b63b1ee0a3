//! Integration tests for the auth session manager.
//!
//! Each test gets its own mock backend and a fresh in-memory store.

#![allow(clippy::unwrap_used)]

use bazaar_core::UserId;
use bazaar_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, ADMIN_TOKEN, CUSTOMER_EMAIL, CUSTOMER_ID, CUSTOMER_PASSWORD,
    CUSTOMER_TOKEN, Failure, MockBackend, unreachable_api,
};
use bazaar_storefront::api::ApiError;
use bazaar_storefront::services::auth::{AuthError, AuthSession, AuthState, Navigation};
use bazaar_storefront::storage::{InMemoryStore, keys};

fn session(backend: &MockBackend, store: &InMemoryStore) -> AuthSession<InMemoryStore> {
    AuthSession::new(backend.api(), store.clone())
}

// ============================================================================
// Initialize
// ============================================================================

#[tokio::test]
async fn test_initialize_restores_valid_token() {
    let backend = MockBackend::start().await;
    backend.issue_user_token(CUSTOMER_TOKEN, CUSTOMER_ID);
    let store = InMemoryStore::with_entries([(keys::USER_TOKEN, CUSTOMER_TOKEN)]);

    let mut auth = session(&backend, &store);
    assert_eq!(*auth.state(), AuthState::Initializing);

    let state = auth.initialize().await;
    let AuthState::Authenticated(user) = state else {
        panic!("expected Authenticated, got {state:?}");
    };
    assert_eq!(user.id, UserId::new(CUSTOMER_ID));
    assert_eq!(store.peek(keys::USER_TOKEN).as_deref(), Some(CUSTOMER_TOKEN));
}

#[tokio::test]
async fn test_initialize_without_token_makes_no_request() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();

    let mut auth = session(&backend, &store);
    assert_eq!(*auth.initialize().await, AuthState::Anonymous);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_initialize_with_rejected_token_signs_out() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::with_entries([(keys::USER_TOKEN, "expired-token")]);

    let mut auth = session(&backend, &store);
    assert_eq!(*auth.initialize().await, AuthState::Anonymous);
    assert_eq!(store.peek(keys::USER_TOKEN), None);
}

#[tokio::test]
async fn test_initialize_with_failing_me_signs_out() {
    let backend = MockBackend::start().await;
    backend.issue_user_token(CUSTOMER_TOKEN, CUSTOMER_ID);
    backend.fail(Failure::Me);
    let store = InMemoryStore::with_entries([
        (keys::USER_TOKEN, CUSTOMER_TOKEN),
        (keys::ADMIN_TOKEN, ADMIN_TOKEN),
    ]);

    let mut auth = session(&backend, &store);
    assert_eq!(*auth.initialize().await, AuthState::Anonymous);
    assert_eq!(store.peek(keys::USER_TOKEN), None);
    // The admin slot is independent
    assert_eq!(store.peek(keys::ADMIN_TOKEN).as_deref(), Some(ADMIN_TOKEN));
}

#[tokio::test]
async fn test_initialize_with_unreachable_backend_signs_out() {
    let store = InMemoryStore::with_entries([(keys::USER_TOKEN, CUSTOMER_TOKEN)]);

    let mut auth = AuthSession::new(unreachable_api().await, store.clone());
    assert_eq!(*auth.initialize().await, AuthState::Anonymous);
    assert_eq!(store.peek(keys::USER_TOKEN), None);
}

#[tokio::test]
async fn test_initialize_runs_once() {
    let backend = MockBackend::start().await;
    backend.issue_user_token(CUSTOMER_TOKEN, CUSTOMER_ID);
    let store = InMemoryStore::with_entries([(keys::USER_TOKEN, CUSTOMER_TOKEN)]);

    let mut auth = session(&backend, &store);
    auth.initialize().await;
    auth.initialize().await;

    assert_eq!(backend.count("GET", "/me"), 1);
}

// ============================================================================
// Login & register
// ============================================================================

#[tokio::test]
async fn test_login_stores_token_and_navigates_to_dashboard() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();

    let mut auth = session(&backend, &store);
    auth.initialize().await;
    let next = auth.login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await.unwrap();

    assert_eq!(next, Navigation::CustomerDashboard);
    assert_eq!(auth.user().map(|u| u.id), Some(UserId::new(CUSTOMER_ID)));
    assert_eq!(store.peek(keys::USER_TOKEN).as_deref(), Some(CUSTOMER_TOKEN));
    // Empty local cart: no sync request
    assert_eq!(backend.count("POST", "/cart-items/sync"), 0);
}

#[tokio::test]
async fn test_login_failure_surfaces_server_message() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();

    let mut auth = session(&backend, &store);
    auth.initialize().await;
    let err = auth.login(CUSTOMER_EMAIL, "wrong").await.unwrap_err();

    match err {
        AuthError::Api(ApiError::Status { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(*auth.state(), AuthState::Anonymous);
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_register_signs_in_without_navigation() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();

    let mut auth = session(&backend, &store);
    let user = auth
        .register("Alan", "alan@example.com", "enigma42", "enigma42")
        .await
        .unwrap();

    assert_eq!(user.email, "alan@example.com");
    assert_eq!(auth.user(), Some(&user));
    assert_eq!(
        store.peek(keys::USER_TOKEN),
        Some(format!("user-token-{}", user.id))
    );
}

#[tokio::test]
async fn test_register_password_mismatch_makes_no_request() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();

    let mut auth = session(&backend, &store);
    let err = auth
        .register("Alan", "alan@example.com", "enigma42", "enigma43")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Validation(ref m) if m == "Passwords do not match"));
    assert!(backend.requests().is_empty());
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_register_duplicate_email_is_unprocessable() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();

    let mut auth = session(&backend, &store);
    let err = auth
        .register("Ada", CUSTOMER_EMAIL, "pw123456", "pw123456")
        .await
        .unwrap_err();

    let AuthError::Api(api) = err else {
        panic!("expected an API error");
    };
    assert_eq!(api.status(), Some(422));
    assert_eq!(api.to_string(), "The email has already been taken.");
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_invalidates_token_server_side() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();

    let mut auth = session(&backend, &store);
    auth.login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await.unwrap();
    assert_eq!(auth.logout().await, Navigation::Login);

    assert!(!backend.user_token_valid(CUSTOMER_TOKEN));
    assert_eq!(*auth.state(), AuthState::Anonymous);
    assert_eq!(store.peek(keys::USER_TOKEN), None);
}

#[tokio::test]
async fn test_logout_fails_open_on_server_error() {
    let backend = MockBackend::start().await;
    backend.issue_user_token(CUSTOMER_TOKEN, CUSTOMER_ID);
    backend.fail(Failure::Logout);
    let store = InMemoryStore::with_entries([
        (keys::USER_TOKEN, CUSTOMER_TOKEN),
        (keys::CART_ITEMS, "[]"),
    ]);

    let mut auth = session(&backend, &store);
    auth.initialize().await;
    assert_eq!(auth.logout().await, Navigation::Login);

    assert_eq!(backend.count("POST", "/logout"), 1);
    assert_eq!(*auth.state(), AuthState::Anonymous);
    assert_eq!(store.peek(keys::USER_TOKEN), None);
    assert_eq!(store.peek(keys::CART_ITEMS), None);
}

#[tokio::test]
async fn test_logout_fails_open_on_network_error() {
    let store = InMemoryStore::with_entries([
        (keys::USER_TOKEN, CUSTOMER_TOKEN),
        (keys::CART_ITEMS, "[]"),
    ]);

    let mut auth = AuthSession::new(unreachable_api().await, store.clone());
    assert_eq!(auth.logout().await, Navigation::Login);

    assert_eq!(*auth.state(), AuthState::Anonymous);
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_refresh_failure_forces_logout() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();

    let mut auth = session(&backend, &store);
    auth.login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await.unwrap();

    backend.fail(Failure::Me);
    assert!(auth.refresh_user().await.is_err());

    assert_eq!(*auth.state(), AuthState::Anonymous);
    assert_eq!(store.peek(keys::USER_TOKEN), None);
}

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
async fn test_admin_login_keeps_user_token() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();

    let mut auth = session(&backend, &store);
    auth.login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await.unwrap();
    let next = auth.admin_login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    assert_eq!(next, Navigation::AdminDashboard);
    assert_eq!(*auth.state(), AuthState::AdminAuthenticated);
    assert_eq!(store.peek(keys::USER_TOKEN).as_deref(), Some(CUSTOMER_TOKEN));
    assert_eq!(store.peek(keys::ADMIN_TOKEN).as_deref(), Some(ADMIN_TOKEN));
}

#[tokio::test]
async fn test_admin_logout_keeps_user_token() {
    let backend = MockBackend::start().await;
    backend.issue_admin_token(ADMIN_TOKEN);
    let store = InMemoryStore::with_entries([
        (keys::USER_TOKEN, CUSTOMER_TOKEN),
        (keys::ADMIN_TOKEN, ADMIN_TOKEN),
    ]);

    let mut auth = session(&backend, &store);
    assert!(auth.resume_admin().await);
    assert_eq!(auth.admin_logout().await, Navigation::Login);

    assert_eq!(backend.count("POST", "/admin/logout"), 1);
    assert_eq!(*auth.state(), AuthState::Anonymous);
    assert_eq!(store.peek(keys::ADMIN_TOKEN), None);
    assert_eq!(store.peek(keys::USER_TOKEN).as_deref(), Some(CUSTOMER_TOKEN));
}

#[tokio::test]
async fn test_admin_login_rejected() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();

    let mut auth = session(&backend, &store);
    auth.initialize().await;
    let err = auth.admin_login(ADMIN_EMAIL, "nope").await.unwrap_err();

    assert!(matches!(err, AuthError::Api(ref e) if e.is_unauthorized()));
    assert_eq!(*auth.state(), AuthState::Anonymous);
    assert_eq!(store.peek(keys::ADMIN_TOKEN), None);
}
