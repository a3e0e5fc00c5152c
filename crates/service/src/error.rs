//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! # Status mapping
//!
//! | Outcome                    | Status |
//! |----------------------------|--------|
//! | `BadRequest`, `Conflict`   | 400    |
//! | `Unauthorized`             | 401    |
//! | `Forbidden`                | 403    |
//! | `NotFound`                 | 404    |
//! | `Internal`, `Unavailable`  | 500    |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::CustomerError;

/// Application-level error type for the customer service.
#[derive(Debug, Error)]
pub enum AppError {
    /// A customer operation failed.
    #[error(transparent)]
    Customer(#[from] CustomerError),

    /// The caller lacks the scope an administrative route requires.
    #[error("{0}")]
    Forbidden(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Customer(err) => match err {
                // Uniqueness violations surface as 400, not 409.
                CustomerError::BadRequest(_) | CustomerError::Conflict(_) => {
                    StatusCode::BAD_REQUEST
                }
                CustomerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                CustomerError::NotFound(_) => StatusCode::NOT_FOUND,
                CustomerError::Internal(_) | CustomerError::Unavailable(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Customer(CustomerError::Internal(_) | CustomerError::Unavailable(_))
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (self.status(), self.to_string()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from the caller's customer id.
///
/// Call this once the gateway identity has been resolved so errors are
/// associated with the customer who triggered them.
pub fn set_sentry_user(customer_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for a customer action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("customer", "Created customer", Some(&[("customer_id", "A1")]));
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
