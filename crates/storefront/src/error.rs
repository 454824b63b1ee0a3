//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Backend failures keep the backend's status class where the client can act
//! on it (401, 404, 422) and otherwise become 502.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::api::ApiError;
use crate::services::admin::AdminError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend API call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Admin operation failed.
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body, shaped like the backend's own errors.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

/// How an error is reported.
struct Classified {
    status: StatusCode,
    message: String,
    server_fault: bool,
}

impl Classified {
    fn client(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            server_fault: false,
        }
    }

    fn server(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
            server_fault: true,
        }
    }
}

fn classify_api(err: &ApiError) -> Classified {
    match err {
        ApiError::Status { status, message } => match *status {
            401 | 403 => Classified::client(StatusCode::UNAUTHORIZED, message.clone()),
            404 => Classified::client(StatusCode::NOT_FOUND, message.clone()),
            422 => Classified::client(StatusCode::UNPROCESSABLE_ENTITY, message.clone()),
            _ => Classified::server(StatusCode::BAD_GATEWAY, "External service error"),
        },
        ApiError::Network(_) | ApiError::Decode(_) => {
            Classified::server(StatusCode::BAD_GATEWAY, "External service error")
        }
    }
}

impl AppError {
    fn classify(&self) -> Classified {
        match self {
            Self::Api(e)
            | Self::Auth(AuthError::Api(e))
            | Self::Cart(CartError::Api(e))
            | Self::Admin(AdminError::Api(e)) => classify_api(e),
            Self::Auth(AuthError::Validation(msg)) => {
                Classified::client(StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Auth(AuthError::NotAuthenticated)
            | Self::Cart(CartError::NotAuthenticated)
            | Self::Admin(AdminError::NotAuthenticated) => {
                Classified::client(StatusCode::UNAUTHORIZED, "Please sign in")
            }
            Self::Cart(CartError::ItemNotFound(_)) | Self::NotFound(_) => {
                Classified::client(StatusCode::NOT_FOUND, "Not found")
            }
            Self::Cart(CartError::Encode(_)) => {
                Classified::server(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            Self::BadRequest(msg) => Classified::client(StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let classified = self.classify();

        // Capture server errors to Sentry
        if classified.server_fault {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = classified.status.as_u16(), "Request rejected");
        }

        (
            classified.status,
            Json(ErrorBody {
                message: classified.message,
            }),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "7")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
