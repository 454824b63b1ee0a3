//! Route guard and authentication extractors.
//!
//! Every extractor builds a fresh [`AuthSession`] over the browser's session
//! and awaits its initialization before deciding, so a protected handler
//! never runs against an unresolved state.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::api::types::User;
use crate::services::auth::{AuthSession, AuthState, Navigation};
use crate::state::AppState;

/// Outcome of guarding a protected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// State not resolved yet: render only a loading placeholder.
    Loading,
    /// Not signed in: go elsewhere.
    Redirect(Navigation),
    /// Render the protected view.
    Admit,
}

/// Decide whether a protected view may render.
#[must_use]
pub const fn guard(state: &AuthState) -> GuardDecision {
    match state {
        AuthState::Initializing => GuardDecision::Loading,
        AuthState::Anonymous => GuardDecision::Redirect(Navigation::Login),
        AuthState::Authenticated(_) | AuthState::AdminAuthenticated => GuardDecision::Admit,
    }
}

/// Rejection from the authentication extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Initialization still pending.
    Loading,
    /// Redirect to the given view.
    Redirect(Navigation),
    /// The session layer is missing from the router.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Loading => (StatusCode::SERVICE_UNAVAILABLE, "Loading...").into_response(),
            Self::Redirect(to) => Redirect::to(to.path()).into_response(),
            Self::MissingSession => {
                tracing::error!("Session layer missing");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl GuardDecision {
    /// `Ok` only for [`GuardDecision::Admit`].
    ///
    /// # Errors
    ///
    /// Returns the matching rejection for `Loading` and `Redirect`.
    pub const fn admit(self) -> Result<(), AuthRejection> {
        match self {
            Self::Admit => Ok(()),
            Self::Loading => Err(AuthRejection::Loading),
            Self::Redirect(to) => Err(AuthRejection::Redirect(to)),
        }
    }
}

fn session_from(parts: &Parts) -> Result<Session, AuthRejection> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::MissingSession)
}

/// Extractor for any visitor; the session is initialized, whatever its state.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Visitor(auth): Visitor) -> impl IntoResponse {
///     match auth.user() {
///         Some(user) => format!("Hello, {}!", user.name),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct Visitor(pub AuthSession<Session>);

impl FromRequestParts<AppState> for Visitor {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let mut auth = state.auth_session(session_from(parts)?);
        auth.initialize().await;
        Ok(Self(auth))
    }
}

/// Extractor that requires a signed-in customer.
///
/// Anonymous visitors are redirected to the login page.
pub struct RequireCustomer {
    pub user: User,
    pub auth: AuthSession<Session>,
}

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Visitor(auth) = Visitor::from_request_parts(parts, state).await?;
        guard(auth.state()).admit()?;

        let user = auth
            .user()
            .cloned()
            .ok_or(AuthRejection::Redirect(Navigation::Login))?;
        Ok(Self { user, auth })
    }
}

/// Extractor that requires a signed-in administrator.
///
/// Admission rests on the stored admin token; the backend has the final
/// word on the first admin call.
pub struct RequireAdmin(pub AuthSession<Session>);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Visitor(mut auth) = Visitor::from_request_parts(parts, state).await?;
        if !auth.resume_admin().await {
            return Err(AuthRejection::Redirect(Navigation::Login));
        }

        guard(auth.state()).admit()?;
        Ok(Self(auth))
    }
}

#[cfg(test)]
mod tests {
    use bazaar_core::UserId;

    use super::*;

    fn user() -> User {
        User {
            id: UserId::new(1),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: None,
            created_at: None,
            role: None,
        }
    }

    #[test]
    fn test_guard_waits_while_initializing() {
        assert_eq!(guard(&AuthState::Initializing), GuardDecision::Loading);
    }

    #[test]
    fn test_guard_redirects_anonymous_to_login() {
        assert_eq!(
            guard(&AuthState::Anonymous),
            GuardDecision::Redirect(Navigation::Login)
        );
    }

    #[test]
    fn test_guard_admits_signed_in() {
        assert_eq!(guard(&AuthState::Authenticated(user())), GuardDecision::Admit);
        assert_eq!(guard(&AuthState::AdminAuthenticated), GuardDecision::Admit);
    }

    #[test]
    fn test_rejection_responses() {
        let response = AuthRejection::Redirect(Navigation::Login).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/login")
        );

        let response = AuthRejection::Loading.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
