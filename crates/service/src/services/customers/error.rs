//! Customer operation error types.

use customer_core::CustomerId;
use thiserror::Error;

use crate::db::StoreError;

/// Resource-level outcome of a failed customer operation.
///
/// Every variant carries a human-readable detail suitable for the response body.
#[derive(Debug, Error)]
pub enum CustomerError {
    /// Missing required input (caller identity or query parameter).
    #[error("{0}")]
    BadRequest(String),

    /// Caller identity does not match the target customer.
    #[error("{0}")]
    Unauthorized(String),

    /// Uniqueness violation on create.
    #[error("{0}")]
    Conflict(String),

    /// No customer at the requested id.
    #[error("{0}")]
    NotFound(String),

    /// Unexpected store or mapping failure.
    #[error("{0}")]
    Internal(String),

    /// The store could not be reached in time.
    #[error("{0}")]
    Unavailable(String),
}

impl CustomerError {
    /// The not-found outcome for `id`.
    #[must_use]
    pub fn not_found(id: &CustomerId) -> Self {
        Self::NotFound(format!("Customer with ID {id} not found"))
    }

    /// Map a store failure that happened while performing `action`.
    ///
    /// Unreachable or slow stores become `Unavailable`; everything else,
    /// including not-found, becomes `Internal`. Use
    /// [`CustomerError::from_lookup`] where not-found is meaningful.
    #[must_use]
    pub fn from_store(action: &str, e: &StoreError) -> Self {
        if e.is_unavailable() {
            Self::Unavailable(format!("{action}: {e}"))
        } else {
            Self::Internal(format!("{action}: {e}"))
        }
    }

    /// Map a store failure from a lookup of `id`.
    #[must_use]
    pub fn from_lookup(id: &CustomerId, action: &str, e: &StoreError) -> Self {
        if e.is_not_found() {
            Self::not_found(id)
        } else {
            Self::from_store(action, e)
        }
    }
}
