//! Customer account route handlers.

use axum::{Json, extract::State};
use bazaar_core::UserId;
use serde::Serialize;
use tracing::instrument;

use crate::api::types::User;
use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::routes::cart::CartView;
use crate::state::AppState;

/// Profile display data.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    /// e.g. "March 2024"
    pub member_since: Option<String>,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            member_since: user.created_at.map(|t| t.format("%B %Y").to_string()),
        }
    }
}

/// Account dashboard data.
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub profile: ProfileView,
    pub cart: CartView,
}

/// Display the account dashboard: profile and server cart.
#[instrument(skip_all, fields(user_id = %customer.user.id))]
pub async fn index(
    State(state): State<AppState>,
    customer: RequireCustomer,
) -> Result<Json<AccountView>> {
    let cart = customer.auth.cart().server_cart().await?;

    Ok(Json(AccountView {
        profile: ProfileView::from(&customer.user),
        cart: CartView::server(&cart, &state.config().storage_url),
    }))
}
