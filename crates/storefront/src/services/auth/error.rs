//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A client-side precondition failed; nothing was sent to the backend.
    #[error("{0}")]
    Validation(String),

    /// The operation needs a signed-in user and there is none.
    #[error("not signed in")]
    NotAuthenticated,

    /// The backend rejected the request or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Password and confirmation differ.
    #[must_use]
    pub fn password_mismatch() -> Self {
        Self::Validation("Passwords do not match".to_string())
    }
}
