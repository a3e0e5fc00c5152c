//! Caller identity types.
//!
//! Token verification happens upstream. By the time a request reaches the
//! service, the gateway has reduced the bearer token to a
//! [`VerifiedCredential`]; the service only ever reads it.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::CustomerId;

/// A credential that has already been verified by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedCredential {
    principal: String,
    scopes: Vec<String>,
    authenticated: bool,
}

impl VerifiedCredential {
    /// Create a credential for `principal` with the given scopes.
    #[must_use]
    pub fn new(principal: impl Into<String>, scopes: Vec<String>, authenticated: bool) -> Self {
        Self {
            principal: principal.into(),
            scopes,
            authenticated,
        }
    }

    /// Whether the gateway reported the credential as authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The principal name the credential was issued to.
    #[must_use]
    pub fn principal_name(&self) -> &str {
        &self.principal
    }

    /// The granted scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Whether `scope` was granted. Unauthenticated credentials hold no scopes.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.authenticated && self.scopes.iter().any(|s| s == scope)
    }
}

/// The resolved identity of the caller.
///
/// Self-service authorization compares this against the target customer id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(CustomerId);

impl CallerIdentity {
    /// Wrap a principal name as a caller identity.
    #[must_use]
    pub fn new(principal: impl Into<String>) -> Self {
        Self(CustomerId::new(principal))
    }

    /// The customer id this caller is allowed to act on.
    #[must_use]
    pub const fn customer_id(&self) -> &CustomerId {
        &self.0
    }

    /// Whether this caller owns the customer record `id`.
    #[must_use]
    pub fn owns(&self, id: &CustomerId) -> bool {
        self.0 == *id
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
