//! Customer resource views.
//!
//! [`Customer`] is what callers read back; [`CustomerPayload`] is what they
//! send on create and update. Neither carries store bookkeeping such as
//! document revisions.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::CustomerId;

/// A customer record as returned to API callers.
///
/// The password is accepted on write but never serialized back out.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Stable identifier, also the owning caller's principal name.
    pub customer_id: CustomerId,
    /// Unique login name.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Opaque password value, stored as given.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl fmt::Debug for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Customer")
            .field("customer_id", &self.customer_id)
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("image_url", &self.image_url)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Request body for creating or updating a customer.
///
/// On create every field is used. On update only the display attributes
/// (`firstName`, `lastName`, `email`, `imageUrl`, `password`) are applied;
/// `customerId` and `username` are ignored.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl CustomerPayload {
    /// The caller-supplied id, if one was given and is not blank.
    #[must_use]
    pub fn supplied_id(&self) -> Option<&CustomerId> {
        self.customer_id.as_ref().filter(|id| !id.is_blank())
    }

    /// The username, if present and not blank.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

impl fmt::Debug for CustomerPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomerPayload")
            .field("customer_id", &self.customer_id)
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("image_url", &self.image_url)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
