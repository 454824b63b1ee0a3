//! Authentication route handlers.
//!
//! Customer and admin sign-in against the backend. Tokens go into the
//! browser's session; handlers answer with a redirect to the next view.

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::types::User;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data (customer and admin).
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

// =============================================================================
// Customer Routes
// =============================================================================

/// Handle login form submission.
///
/// Signs in, merges the anonymous cart and redirects to the account page.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let mut auth = state.auth_session(session);
    let next = auth.login(&form.email, &form.password).await?;

    if let Some(user) = auth.user() {
        set_sentry_user(&user.id, Some(&user.email));
    }
    Ok(Redirect::to(next.path()).into_response())
}

/// Handle registration form submission.
///
/// The new account is signed in and its cart merged; the user is returned.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<(StatusCode, Json<User>)> {
    let mut auth = state.auth_session(session);
    let user = auth
        .register(
            &form.name,
            &form.email,
            &form.password,
            &form.password_confirmation,
        )
        .await?;

    set_sentry_user(&user.id, Some(&user.email));
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handle logout. Always succeeds locally.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    let mut auth = state.auth_session(session);
    let next = auth.logout().await;

    clear_sentry_user();
    Redirect::to(next.path())
}

// =============================================================================
// Admin Routes
// =============================================================================

/// Handle admin login form submission.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn admin_login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let mut auth = state.auth_session(session);
    let next = auth.admin_login(&form.email, &form.password).await?;
    Ok(Redirect::to(next.path()))
}

/// Handle admin logout. Always succeeds locally.
#[instrument(skip_all)]
pub async fn admin_logout(State(state): State<AppState>, session: Session) -> Redirect {
    let mut auth = state.auth_session(session);
    let next = auth.admin_logout().await;
    Redirect::to(next.path())
}
