//! Newtype ID for customer references.
//!
//! Customer ids are opaque strings. They are either supplied by the caller
//! on creation or assigned by the document store, and they double as the
//! principal name a caller authenticates with.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a customer document.
///
/// # Example
///
/// ```rust
/// # use customer_core::CustomerId;
/// let id = CustomerId::new("A1");
/// assert_eq!(id.as_str(), "A1");
/// assert_eq!(id.to_string(), "A1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    /// Create a new ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the ID is empty or whitespace only.
    ///
    /// Blank ids are treated as "not supplied" on creation.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CustomerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CustomerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CustomerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}
