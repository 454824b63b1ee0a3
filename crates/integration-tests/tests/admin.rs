//! Integration tests for admin tables.
//!
//! Mutations go through an `AdminConsole` and are checked both on the table
//! rows and on the mock backend.

#![allow(clippy::unwrap_used)]

use bazaar_core::{DealId, Price, ProductId, UserId};
use bazaar_integration_tests::{
    ADMIN_TOKEN, CUSTOMER_ID, CUSTOMER_TOKEN, Failure, LAMP_ID, MockBackend,
};
use bazaar_storefront::api::types::{DealInput, NewProduct, ProductImage, ProductInput};
use bazaar_storefront::services::admin::{AdminConsole, AdminError, DashboardCounts, RowState};
use bazaar_storefront::services::auth::{AuthSession, AuthState};
use bazaar_storefront::storage::{InMemoryStore, SessionStore, keys};

/// A session resumed from a stored, valid admin token.
async fn admin_session(backend: &MockBackend, store: &InMemoryStore) -> AuthSession<InMemoryStore> {
    backend.issue_admin_token(ADMIN_TOKEN);
    store.set(keys::ADMIN_TOKEN, ADMIN_TOKEN.to_string()).await;

    let mut auth = AuthSession::new(backend.api(), store.clone());
    assert!(auth.resume_admin().await);
    auth
}

fn lamp_input(price_cents: i64) -> ProductInput {
    ProductInput {
        name: "Desk Lamp".to_string(),
        description: "Warm reading light".to_string(),
        price: Price::from_cents(price_cents),
        stock: 12,
        category: "Lighting".to_string(),
    }
}

#[tokio::test]
async fn test_dashboard_counts() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();
    let mut auth = admin_session(&backend, &store).await;

    let counts = AdminConsole::new(&mut auth).dashboard().await.unwrap();

    assert_eq!(
        counts,
        DashboardCounts {
            products: 3,
            deals: 1,
            users: 2,
        }
    );
}

#[tokio::test]
async fn test_console_requires_admin_token() {
    let backend = MockBackend::start().await;
    let mut auth = AuthSession::new(backend.api(), InMemoryStore::new());

    let err = AdminConsole::new(&mut auth).users().await.unwrap_err();

    assert!(matches!(err, AdminError::NotAuthenticated));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_rejected_admin_token_ends_admin_session() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::with_entries([(keys::USER_TOKEN, CUSTOMER_TOKEN)]);
    let mut auth = admin_session(&backend, &store).await;

    backend.revoke_admin_tokens();
    let err = AdminConsole::new(&mut auth).users().await.unwrap_err();

    assert!(matches!(err, AdminError::Api(ref e) if e.is_unauthorized()));
    assert_eq!(*auth.state(), AuthState::Anonymous);
    assert!(auth.admin_token().await.is_none());
    // The customer session survives
    assert!(auth.user_token().await.is_some());
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_create_product_with_image() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();
    let mut auth = admin_session(&backend, &store).await;
    let mut console = AdminConsole::new(&mut auth);

    let mut table = console.products().await.unwrap();
    let created = console
        .create_product(
            &mut table,
            NewProduct {
                fields: ProductInput {
                    name: "Floor Lamp".to_string(),
                    ..lamp_input(8900)
                },
                image: Some(ProductImage {
                    file_name: "floor.png".to_string(),
                    content_type: Some("image/png".to_string()),
                    bytes: vec![0x89, 0x50, 0x4e, 0x47],
                }),
            },
        )
        .await
        .unwrap();

    assert_eq!(created.name, "Floor Lamp");
    assert_eq!(created.price, Price::from_cents(8900));
    assert_eq!(created.image.as_deref(), Some("products/floor.png"));
    assert_eq!(table.len(), 4);
    assert_eq!(
        table.get(created.id).map(|r| &r.state),
        Some(&RowState::Confirmed)
    );

    let create = backend
        .requests()
        .into_iter()
        .find(|r| r.method == "POST" && r.path == "/products")
        .unwrap();
    assert_eq!(create.bearer.as_deref(), Some(ADMIN_TOKEN));
}

#[tokio::test]
async fn test_update_product_confirms_row() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();
    let mut auth = admin_session(&backend, &store).await;
    let mut console = AdminConsole::new(&mut auth);
    let lamp = ProductId::new(LAMP_ID);

    let mut table = console.products().await.unwrap();
    console
        .update_product(&mut table, lamp, &lamp_input(1299))
        .await
        .unwrap();

    let row = table.get(lamp).unwrap();
    assert_eq!(row.state, RowState::Confirmed);
    assert_eq!(row.record.price, Price::from_cents(1299));
}

#[tokio::test]
async fn test_failed_update_marks_row_failed() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();
    let mut auth = admin_session(&backend, &store).await;
    let mut console = AdminConsole::new(&mut auth);
    let lamp = ProductId::new(LAMP_ID);

    let mut table = console.products().await.unwrap();
    backend.fail(Failure::AdminWrites);
    let err = console
        .update_product(&mut table, lamp, &lamp_input(1299))
        .await
        .unwrap_err();

    let row = table.get(lamp).unwrap();
    assert_eq!(row.state, RowState::Failed(err.to_string()));
    // Last confirmed value is kept
    assert_eq!(row.record.price, Price::from_cents(999));
}

#[tokio::test]
async fn test_delete_product_removes_row() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();
    let mut auth = admin_session(&backend, &store).await;
    let mut console = AdminConsole::new(&mut auth);
    let lamp = ProductId::new(LAMP_ID);

    let mut table = console.products().await.unwrap();
    console.delete_product(&mut table, lamp).await.unwrap();

    assert!(table.get(lamp).is_none());
    assert_eq!(console.products().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_delete_keeps_row() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();
    let mut auth = admin_session(&backend, &store).await;
    let mut console = AdminConsole::new(&mut auth);
    let lamp = ProductId::new(LAMP_ID);

    let mut table = console.products().await.unwrap();
    backend.fail(Failure::AdminWrites);
    assert!(console.delete_product(&mut table, lamp).await.is_err());

    let row = table.get(lamp).unwrap();
    assert!(matches!(row.state, RowState::Failed(_)));
    assert_eq!(table.len(), 3);
}

// ============================================================================
// Deals & users
// ============================================================================

#[tokio::test]
async fn test_deal_lifecycle() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();
    let mut auth = admin_session(&backend, &store).await;
    let mut console = AdminConsole::new(&mut auth);

    let mut table = console.deals().await.unwrap();
    assert_eq!(table.len(), 1);

    let input = DealInput {
        product_id: ProductId::new(LAMP_ID),
        title: "Spring sale".to_string(),
        description: "10% off".to_string(),
    };
    let deal = console.create_deal(&mut table, &input).await.unwrap();
    assert_eq!(table.len(), 2);

    let renamed = DealInput {
        title: "Summer sale".to_string(),
        ..input
    };
    console
        .update_deal(&mut table, deal.id, &renamed)
        .await
        .unwrap();
    assert_eq!(
        table.get(deal.id).map(|r| r.record.title.as_str()),
        Some("Summer sale")
    );

    console.delete_deal(&mut table, DealId::new(1)).await.unwrap();
    assert!(table.get(DealId::new(1)).is_none());
    assert_eq!(table.len(), 1);
}

#[tokio::test]
async fn test_delete_user() {
    let backend = MockBackend::start().await;
    let store = InMemoryStore::new();
    let mut auth = admin_session(&backend, &store).await;
    let mut console = AdminConsole::new(&mut auth);

    let mut table = console.users().await.unwrap();
    assert_eq!(table.len(), 2);

    console
        .delete_user(&mut table, UserId::new(CUSTOMER_ID))
        .await
        .unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(backend.count("DELETE", &format!("/admin/users/{CUSTOMER_ID}")), 1);
}
