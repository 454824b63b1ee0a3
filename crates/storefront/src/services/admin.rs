//! Admin management of products, deals and users.
//!
//! Every call carries the admin token. A 401 from any admin endpoint ends the
//! admin session.
//!
//! Lists are held in an [`AdminTable`] whose rows move through explicit
//! states while a mutation is in flight:
//!
//! ```text
//! Confirmed ──mark_pending──▶ Pending ──confirm_*──▶ Confirmed (or removed)
//!                                      └──fail─────▶ Failed(message)
//! ```

use bazaar_core::{DealId, ProductId, UserId};
use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::api::ApiError;
use crate::api::types::{Deal, DealInput, NewProduct, Product, ProductInput, User};
use crate::services::auth::AuthSession;
use crate::storage::SessionStore;

/// Errors from admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// No admin token is stored.
    #[error("admin sign-in required")]
    NotAuthenticated,

    /// The backend rejected the request or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),
}

// =============================================================================
// AdminTable
// =============================================================================

/// A record with a backend id.
pub trait Keyed {
    type Key: Copy + Eq + std::fmt::Debug;

    fn key(&self) -> Self::Key;
}

impl Keyed for Product {
    type Key = ProductId;

    fn key(&self) -> ProductId {
        self.id
    }
}

impl Keyed for Deal {
    type Key = DealId;

    fn key(&self) -> DealId {
        self.id
    }
}

impl Keyed for User {
    type Key = UserId;

    fn key(&self) -> UserId {
        self.id
    }
}

/// Sync state of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum RowState {
    Confirmed,
    Pending,
    Failed(String),
}

/// One row of an [`AdminTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row<T> {
    pub record: T,
    #[serde(flatten)]
    pub state: RowState,
}

/// An admin list with per-row mutation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AdminTable<T> {
    rows: Vec<Row<T>>,
}

impl<T> Default for AdminTable<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: Keyed> AdminTable<T> {
    /// A table of freshly fetched, confirmed records.
    #[must_use]
    pub fn new(records: Vec<T>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| Row {
                record,
                state: RowState::Confirmed,
            })
            .collect();
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[Row<T>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: T::Key) -> Option<&Row<T>> {
        self.rows.iter().find(|r| r.record.key() == key)
    }

    /// Mark a row as having a mutation in flight. Returns `false` if absent.
    pub fn mark_pending(&mut self, key: T::Key) -> bool {
        self.set_state(key, RowState::Pending)
    }

    /// Record a failed mutation; the row keeps its last confirmed value.
    pub fn fail(&mut self, key: T::Key, message: impl Into<String>) -> bool {
        self.set_state(key, RowState::Failed(message.into()))
    }

    /// Append a record the backend just created.
    pub fn confirm_create(&mut self, record: T) {
        self.rows.push(Row {
            record,
            state: RowState::Confirmed,
        });
    }

    /// Replace a row with the backend's updated record.
    pub fn confirm_update(&mut self, record: T) {
        let key = record.key();
        match self.rows.iter_mut().find(|r| r.record.key() == key) {
            Some(row) => {
                row.record = record;
                row.state = RowState::Confirmed;
            }
            None => self.confirm_create(record),
        }
    }

    /// Drop a row the backend just deleted.
    pub fn confirm_delete(&mut self, key: T::Key) {
        self.rows.retain(|r| r.record.key() != key);
    }

    fn set_state(&mut self, key: T::Key, state: RowState) -> bool {
        match self.rows.iter_mut().find(|r| r.record.key() == key) {
            Some(row) => {
                row.state = state;
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// AdminConsole
// =============================================================================

/// Record counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub products: usize,
    pub deals: usize,
    pub users: usize,
}

/// Admin operations on behalf of a signed-in administrator.
pub struct AdminConsole<'a, S> {
    session: &'a mut AuthSession<S>,
}

impl<'a, S: SessionStore> AdminConsole<'a, S> {
    #[must_use]
    pub const fn new(session: &'a mut AuthSession<S>) -> Self {
        Self { session }
    }

    /// Counts of products, deals and users, fetched concurrently.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three requests fails.
    #[instrument(skip(self))]
    pub async fn dashboard(&mut self) -> Result<DashboardCounts, AdminError> {
        let token = self.token().await?;
        let api = self.session.api();
        let result = tokio::try_join!(
            api.products(),
            api.deals(Some(&token)),
            api.admin_users(&token)
        );

        let (products, deals, users) = self.check(result).await?;
        Ok(DashboardCounts {
            products: products.len(),
            deals: deals.len(),
            users: users.len(),
        })
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn products(&mut self) -> Result<AdminTable<Product>, AdminError> {
        let result = self.session.api().products().await;
        Ok(AdminTable::new(self.check(result).await?))
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the product.
    #[instrument(skip(self, table, product), fields(name = %product.fields.name))]
    pub async fn create_product(
        &mut self,
        table: &mut AdminTable<Product>,
        product: NewProduct,
    ) -> Result<Product, AdminError> {
        let token = self.token().await?;
        let result = self.session.api().create_product(&token, product).await;
        let created = self.check(result).await?;

        tracing::info!(product_id = %created.id, "Product created");
        table.confirm_create(created.clone());
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, table, input))]
    pub async fn update_product(
        &mut self,
        table: &mut AdminTable<Product>,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, AdminError> {
        let token = self.token().await?;
        table.mark_pending(id);

        let result = self.session.api().update_product(&token, id, input).await;
        match self.check(result).await {
            Ok(product) => {
                table.confirm_update(product.clone());
                Ok(product)
            }
            Err(e) => {
                table.fail(id, e.to_string());
                Err(e)
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, table))]
    pub async fn delete_product(
        &mut self,
        table: &mut AdminTable<Product>,
        id: ProductId,
    ) -> Result<(), AdminError> {
        let token = self.token().await?;
        table.mark_pending(id);

        let result = self.session.api().delete_product(&token, id).await;
        self.settle_delete(table, id, result).await
    }

    // =========================================================================
    // Deals
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn deals(&mut self) -> Result<AdminTable<Deal>, AdminError> {
        let token = self.token().await?;
        let result = self.session.api().deals(Some(&token)).await;
        Ok(AdminTable::new(self.check(result).await?))
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the deal.
    #[instrument(skip(self, table, input))]
    pub async fn create_deal(
        &mut self,
        table: &mut AdminTable<Deal>,
        input: &DealInput,
    ) -> Result<Deal, AdminError> {
        let token = self.token().await?;
        let result = self.session.api().create_deal(&token, input).await;
        let created = self.check(result).await?;

        tracing::info!(deal_id = %created.id, "Deal created");
        table.confirm_create(created.clone());
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, table, input))]
    pub async fn update_deal(
        &mut self,
        table: &mut AdminTable<Deal>,
        id: DealId,
        input: &DealInput,
    ) -> Result<Deal, AdminError> {
        let token = self.token().await?;
        table.mark_pending(id);

        let result = self.session.api().update_deal(&token, id, input).await;
        match self.check(result).await {
            Ok(deal) => {
                table.confirm_update(deal.clone());
                Ok(deal)
            }
            Err(e) => {
                table.fail(id, e.to_string());
                Err(e)
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, table))]
    pub async fn delete_deal(
        &mut self,
        table: &mut AdminTable<Deal>,
        id: DealId,
    ) -> Result<(), AdminError> {
        let token = self.token().await?;
        table.mark_pending(id);

        let result = self.session.api().delete_deal(&token, id).await;
        self.settle_delete(table, id, result).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn users(&mut self) -> Result<AdminTable<User>, AdminError> {
        let token = self.token().await?;
        let result = self.session.api().admin_users(&token).await;
        Ok(AdminTable::new(self.check(result).await?))
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, table))]
    pub async fn delete_user(
        &mut self,
        table: &mut AdminTable<User>,
        id: UserId,
    ) -> Result<(), AdminError> {
        let token = self.token().await?;
        table.mark_pending(id);

        let result = self.session.api().delete_user(&token, id).await;
        self.settle_delete(table, id, result).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn token(&self) -> Result<SecretString, AdminError> {
        self.session
            .admin_token()
            .await
            .ok_or(AdminError::NotAuthenticated)
    }

    /// Convert an API result, ending the admin session on 401.
    async fn check<T>(&mut self, result: Result<T, ApiError>) -> Result<T, AdminError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_unauthorized() {
                    self.session.admin_token_rejected().await;
                } else {
                    tracing::warn!(error = %e, "Admin request failed");
                }
                Err(e.into())
            }
        }
    }

    async fn settle_delete<T: Keyed>(
        &mut self,
        table: &mut AdminTable<T>,
        key: T::Key,
        result: Result<(), ApiError>,
    ) -> Result<(), AdminError> {
        match self.check(result).await {
            Ok(()) => {
                tracing::info!(?key, "Record deleted");
                table.confirm_delete(key);
                Ok(())
            }
            Err(e) => {
                table.fail(key, e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::Price;

    fn product(id: i64, name: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: None,
            price: Price::from_cents(500),
            stock: Some(3),
            category: Some("Lamps".to_string()),
            image: None,
        }
    }

    #[test]
    fn test_new_table_is_confirmed() {
        let table = AdminTable::new(vec![product(1, "Lamp"), product(2, "Desk")]);
        assert_eq!(table.len(), 2);
        assert!(table.rows().iter().all(|r| r.state == RowState::Confirmed));
    }

    #[test]
    fn test_update_moves_pending_to_confirmed() {
        let mut table = AdminTable::new(vec![product(1, "Lamp")]);

        assert!(table.mark_pending(ProductId::new(1)));
        assert_eq!(table.get(ProductId::new(1)).unwrap().state, RowState::Pending);

        table.confirm_update(product(1, "Floor lamp"));
        let row = table.get(ProductId::new(1)).unwrap();
        assert_eq!(row.state, RowState::Confirmed);
        assert_eq!(row.record.name, "Floor lamp");
    }

    #[test]
    fn test_failed_mutation_keeps_record() {
        let mut table = AdminTable::new(vec![product(1, "Lamp")]);

        table.mark_pending(ProductId::new(1));
        table.fail(ProductId::new(1), "The name field is required.");

        let row = table.get(ProductId::new(1)).unwrap();
        assert_eq!(row.record.name, "Lamp");
        assert_eq!(
            row.state,
            RowState::Failed("The name field is required.".to_string())
        );
    }

    #[test]
    fn test_delete_removes_row() {
        let mut table = AdminTable::new(vec![product(1, "Lamp"), product(2, "Desk")]);
        table.confirm_delete(ProductId::new(1));

        assert_eq!(table.len(), 1);
        assert!(table.get(ProductId::new(1)).is_none());
    }

    #[test]
    fn test_mark_pending_unknown_row() {
        let mut table: AdminTable<Product> = AdminTable::default();
        assert!(!table.mark_pending(ProductId::new(9)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_row_serializes_state() {
        let mut table = AdminTable::new(vec![product(1, "Lamp")]);
        table.fail(ProductId::new(1), "nope");

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json[0]["state"], "failed");
        assert_eq!(json[0]["error"], "nope");
        assert_eq!(json[0]["record"]["name"], "Lamp");
    }
}
