//! Authentication session management.
//!
//! [`AuthSession`] owns the in-memory view of who is signed in for one client
//! and keeps it consistent with the tokens in that client's [`SessionStore`].
//!
//! # States
//!
//! ```text
//! Initializing ──initialize──▶ Authenticated(user)   (token validated by GET /me)
//!              └────────────▶ Anonymous              (no token, or /me failed)
//! Anonymous ──login/register──▶ Authenticated(user)
//! Anonymous ──admin_login─────▶ AdminAuthenticated
//! any ──logout/admin_logout───▶ Anonymous            (always, even offline)
//! ```
//!
//! The user and admin tokens live in separate slots. Which area a client sees
//! is decided by the route guard per area; within one `AuthSession` the most
//! recent transition wins.

mod error;

pub use error::AuthError;

use secrecy::SecretString;
use tracing::instrument;

use crate::api::ApiClient;
use crate::api::types::{LoginRequest, RegisterRequest, User};
use crate::services::cart::CartSync;
use crate::storage::{SessionStore, keys};

/// Authentication state of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Stored token not yet validated.
    Initializing,
    /// No valid session.
    Anonymous,
    /// A customer is signed in.
    Authenticated(User),
    /// An administrator is signed in.
    AdminAuthenticated,
}

impl AuthState {
    /// Whether initialization has finished.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Initializing)
    }

    /// The signed-in customer, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Where the client should go after an auth transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    CustomerDashboard,
    AdminDashboard,
    Login,
}

impl Navigation {
    /// Path of the target view.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::CustomerDashboard => "/account",
            Self::AdminDashboard => "/admin",
            Self::Login => "/login",
        }
    }
}

/// Auth session manager for one client.
pub struct AuthSession<S> {
    api: ApiClient,
    store: S,
    cart: CartSync<S>,
    state: AuthState,
}

impl<S: SessionStore + Clone> AuthSession<S> {
    /// Create a manager in the `Initializing` state.
    #[must_use]
    pub fn new(api: ApiClient, store: S) -> Self {
        let cart = CartSync::new(api.clone(), store.clone());
        Self {
            api,
            store,
            cart,
            state: AuthState::Initializing,
        }
    }
}

impl<S: SessionStore> AuthSession<S> {
    #[must_use]
    pub const fn state(&self) -> &AuthState {
        &self.state
    }

    /// The signed-in customer, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.state.user()
    }

    /// Cart operations over the same storage.
    #[must_use]
    pub const fn cart(&self) -> &CartSync<S> {
        &self.cart
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The stored user token.
    pub async fn user_token(&self) -> Option<SecretString> {
        self.store.get(keys::USER_TOKEN).await.map(SecretString::from)
    }

    /// The stored admin token.
    pub async fn admin_token(&self) -> Option<SecretString> {
        self.store.get(keys::ADMIN_TOKEN).await.map(SecretString::from)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Resolve the stored user token into a state.
    ///
    /// Runs once; later calls return the current state unchanged. A stored
    /// token the backend rejects is removed.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self) -> &AuthState {
        if self.state.is_resolved() {
            return &self.state;
        }

        self.state = match self.user_token().await {
            None => AuthState::Anonymous,
            Some(token) => match self.api.me(&token).await {
                Ok(user) => {
                    tracing::debug!(user_id = %user.id, "Restored session");
                    AuthState::Authenticated(user)
                }
                Err(e) => {
                    tracing::info!(error = %e, "Stored token rejected, signing out");
                    self.store.remove(keys::USER_TOKEN).await;
                    AuthState::Anonymous
                }
            },
        };

        &self.state
    }

    /// Enter the admin area with a stored admin token.
    ///
    /// There is no endpoint to validate an admin token, so presence is
    /// enough; the first admin call that gets a 401 ends the admin session
    /// (see [`Self::admin_token_rejected`]). Returns whether the client is
    /// now `AdminAuthenticated`.
    pub async fn resume_admin(&mut self) -> bool {
        if self.admin_token().await.is_some() {
            self.state = AuthState::AdminAuthenticated;
            true
        } else {
            false
        }
    }

    // =========================================================================
    // Customer authentication
    // =========================================================================

    /// Sign a customer in and merge the local cart into their server cart.
    ///
    /// A failed merge is logged and leaves the local cart for a later retry;
    /// it does not fail the login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Api` if the backend rejects the credentials or is
    /// unreachable. State and storage are unchanged in that case.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Navigation, AuthError> {
        let response = self.api.login(&LoginRequest { email, password }).await?;
        tracing::info!(user_id = %response.user.id, "User signed in");

        self.sign_in(response.user, response.token).await;
        Ok(Navigation::CustomerDashboard)
    }

    /// Create an account and sign it in.
    ///
    /// The confirmation is checked before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the passwords differ, or
    /// `AuthError::Api` if the backend rejects the registration.
    #[instrument(skip(self, password, password_confirmation))]
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<User, AuthError> {
        if password != password_confirmation {
            return Err(AuthError::password_mismatch());
        }

        let response = self
            .api
            .register(&RegisterRequest {
                name,
                email,
                password,
                password_confirmation,
            })
            .await?;
        tracing::info!(user_id = %response.user.id, "User registered");

        let user = response.user.clone();
        self.sign_in(response.user, response.token).await;
        Ok(user)
    }

    /// Sign the customer out.
    ///
    /// Server-side invalidation is best effort: whatever the backend says,
    /// the user token and the local cart are removed and the state becomes
    /// `Anonymous`.
    #[instrument(skip(self))]
    pub async fn logout(&mut self) -> Navigation {
        if let Some(token) = self.user_token().await
            && let Err(e) = self.api.logout(&token).await
        {
            tracing::warn!(error = %e, "Server-side logout failed");
        }

        self.store.remove(keys::USER_TOKEN).await;
        self.cart.clear_local().await;
        self.state = AuthState::Anonymous;

        tracing::info!("User signed out");
        Navigation::Login
    }

    /// Re-fetch the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` without a stored token. Any
    /// backend failure signs the client out and is returned.
    #[instrument(skip(self))]
    pub async fn refresh_user(&mut self) -> Result<User, AuthError> {
        let Some(token) = self.user_token().await else {
            return Err(AuthError::NotAuthenticated);
        };

        match self.api.me(&token).await {
            Ok(user) => {
                self.state = AuthState::Authenticated(user.clone());
                Ok(user)
            }
            Err(e) => {
                tracing::info!(error = %e, "Refresh failed, signing out");
                self.logout().await;
                Err(e.into())
            }
        }
    }

    async fn sign_in(&mut self, user: User, token: String) {
        self.store.set(keys::USER_TOKEN, token.clone()).await;
        self.state = AuthState::Authenticated(user);

        if let Err(e) = self.cart.merge_on_auth(&SecretString::from(token)).await {
            tracing::warn!(error = %e, "Cart merge failed, local cart kept");
        }
    }

    // =========================================================================
    // Admin authentication
    // =========================================================================

    /// Sign an administrator in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Api` if the backend rejects the credentials or is
    /// unreachable.
    #[instrument(skip(self, password))]
    pub async fn admin_login(&mut self, email: &str, password: &str) -> Result<Navigation, AuthError> {
        let response = self
            .api
            .admin_login(&LoginRequest { email, password })
            .await?;

        self.store.set(keys::ADMIN_TOKEN, response.token).await;
        self.state = AuthState::AdminAuthenticated;

        tracing::info!("Admin signed in");
        Ok(Navigation::AdminDashboard)
    }

    /// Sign the administrator out. Fails open like [`Self::logout`].
    #[instrument(skip(self))]
    pub async fn admin_logout(&mut self) -> Navigation {
        if let Some(token) = self.admin_token().await
            && let Err(e) = self.api.admin_logout(&token).await
        {
            tracing::warn!(error = %e, "Server-side admin logout failed");
        }

        self.store.remove(keys::ADMIN_TOKEN).await;
        self.cart.clear_local().await;
        self.state = AuthState::Anonymous;

        tracing::info!("Admin signed out");
        Navigation::Login
    }

    /// Drop an admin token the backend answered 401 for.
    pub async fn admin_token_rejected(&mut self) {
        tracing::info!("Admin token rejected, signing out");
        self.store.remove(keys::ADMIN_TOKEN).await;
        if self.state == AuthState::AdminAuthenticated {
            self.state = AuthState::Anonymous;
        }
    }
}
