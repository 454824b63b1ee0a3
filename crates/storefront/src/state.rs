//! Application state shared across handlers.

use std::sync::Arc;

use tower_sessions::Session;

use crate::api::ApiClient;
use crate::config::StorefrontConfig;
use crate::services::auth::AuthSession;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let api = ApiClient::new(&config.api_url);

        Self {
            inner: Arc::new(AppStateInner { config, api }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// A fresh, uninitialized auth session over a browser session.
    #[must_use]
    pub fn auth_session(&self, session: Session) -> AuthSession<Session> {
        AuthSession::new(self.api().clone(), session)
    }
}
