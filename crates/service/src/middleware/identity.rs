//! Gateway credential middleware and caller extractors.
//!
//! Bearer tokens are verified by the gateway in front of this service. The
//! gateway forwards the outcome as plain headers, which
//! [`gateway_credential_middleware`] turns into a [`VerifiedCredential`]
//! request extension. Handlers never read the headers directly.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use customer_core::{CallerIdentity, VerifiedCredential};
use tracing::{Span, debug};

use crate::error::AppError;

/// Principal name the gateway extracted from the token.
pub const PRINCIPAL_HEADER: &str = "x-auth-principal";

/// Granted scopes, space- or comma-separated.
pub const SCOPES_HEADER: &str = "x-auth-scopes";

/// Verification outcome; only [`AUTHENTICATED`] counts as authenticated.
pub const STATUS_HEADER: &str = "x-auth-status";

/// Value of [`STATUS_HEADER`] for a verified token.
pub const AUTHENTICATED: &str = "authenticated";

/// Scope required by the administrative username search.
pub const ADMIN_SCOPE: &str = "admin";

/// Middleware that records the gateway's verified credential on the request.
///
/// Requests without a principal header pass through with no credential.
pub async fn gateway_credential_middleware(mut request: Request, next: Next) -> Response {
    if let Some(credential) = credential_from_headers(request.headers()) {
        if let Some(caller) = resolve_caller_identity(Some(&credential)) {
            Span::current().record("customer_id", tracing::field::display(&caller));
            crate::error::set_sentry_user(&caller);
        }
        request.extensions_mut().insert(credential);
    }

    next.run(request).await
}

fn credential_from_headers(headers: &HeaderMap) -> Option<VerifiedCredential> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);

    let principal = header(PRINCIPAL_HEADER).filter(|p| !p.is_empty())?;
    let scopes = header(SCOPES_HEADER)
        .map(|raw| {
            raw.split([' ', ','])
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    let authenticated = header(STATUS_HEADER).is_some_and(|s| s.eq_ignore_ascii_case(AUTHENTICATED));

    Some(VerifiedCredential::new(principal, scopes, authenticated))
}

/// Resolve the caller identity from a verified credential.
///
/// `None` when there is no credential, it is not in an authenticated state,
/// or its principal name is blank; otherwise the principal name.
#[must_use]
pub fn resolve_caller_identity(credential: Option<&VerifiedCredential>) -> Option<CallerIdentity> {
    let Some(credential) = credential else {
        debug!("No credential on request");
        return None;
    };

    if !credential.is_authenticated() || credential.principal_name().trim().is_empty() {
        debug!(
            principal = credential.principal_name(),
            "Credential not usable as caller identity"
        );
        return None;
    }

    Some(CallerIdentity::new(credential.principal_name()))
}

/// Extractor for the caller identity, if any.
///
/// Never rejects. Handlers pass the inner value to the customer service,
/// which decides what a missing identity means for each operation.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Caller(caller): Caller) -> impl IntoResponse {
///     match caller {
///         Some(c) => format!("Hello, {c}!"),
///         None => "Hello, stranger!".to_string(),
///     }
/// }
/// ```
pub struct Caller(pub Option<CallerIdentity>);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_caller_identity(
            parts.extensions.get::<VerifiedCredential>(),
        )))
    }
}

/// Extractor that requires the [`ADMIN_SCOPE`] on an authenticated credential.
pub struct AdminScope(pub VerifiedCredential);

impl<S> FromRequestParts<S> for AdminScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedCredential>()
            .filter(|c| c.has_scope(ADMIN_SCOPE))
            .cloned()
            .map(Self)
            .ok_or_else(|| AppError::Forbidden(format!("Scope '{ADMIN_SCOPE}' required")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.insert(name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_resolve_requires_authenticated_credential() {
        assert!(resolve_caller_identity(None).is_none());

        let pending = VerifiedCredential::new("A1", Vec::new(), false);
        assert!(resolve_caller_identity(Some(&pending)).is_none());

        let blank = VerifiedCredential::new("  ", Vec::new(), true);
        assert!(resolve_caller_identity(Some(&blank)).is_none());

        let verified = VerifiedCredential::new("A1", Vec::new(), true);
        assert_eq!(
            resolve_caller_identity(Some(&verified)).unwrap().to_string(),
            "A1"
        );
    }

    #[test]
    fn test_credential_from_headers() {
        let credential = credential_from_headers(&headers(&[
            (PRINCIPAL_HEADER, "A1"),
            (SCOPES_HEADER, "blue, admin"),
            (STATUS_HEADER, "authenticated"),
        ]))
        .unwrap();

        assert_eq!(credential.principal_name(), "A1");
        assert_eq!(credential.scopes(), ["blue", "admin"]);
        assert!(credential.has_scope(ADMIN_SCOPE));
    }

    #[test]
    fn test_credential_needs_principal_and_status() {
        assert!(credential_from_headers(&headers(&[(STATUS_HEADER, "authenticated")])).is_none());

        let unverified = credential_from_headers(&headers(&[
            (PRINCIPAL_HEADER, "A1"),
            (SCOPES_HEADER, "admin"),
        ]))
        .unwrap();
        assert!(!unverified.is_authenticated());
        assert!(!unverified.has_scope(ADMIN_SCOPE));
    }
}
