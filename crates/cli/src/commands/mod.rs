//! Command implementations.
//!
//! Each command builds an [`AuthSession`] over the state file, performs one
//! operation and writes a human-readable result to `out`.

pub mod account;
pub mod admin;
pub mod shop;

use bazaar_storefront::api::{ApiClient, ApiError};
use bazaar_storefront::services::admin::AdminError;
use bazaar_storefront::services::auth::{AuthError, AuthSession};
use bazaar_storefront::services::cart::CartError;
use bazaar_core::ProductId;
use thiserror::Error;

use crate::store::FileStore;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("not signed in, run `bz login` first")]
    NotSignedIn,

    #[error("admin sign-in required, run `bz admin login` first")]
    NotAdmin,

    #[error("could not write output: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Backend client and state file shared by all commands.
#[derive(Debug, Clone)]
pub struct Context {
    pub api: ApiClient,
    pub store: FileStore,
}

impl Context {
    pub const fn new(api: ApiClient, store: FileStore) -> Self {
        Self { api, store }
    }

    /// A fresh, uninitialized session over the state file.
    pub fn session(&self) -> AuthSession<FileStore> {
        AuthSession::new(self.api.clone(), self.store.clone())
    }
}
