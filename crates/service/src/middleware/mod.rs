//! HTTP middleware stack for the customer service.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction tracing)
//! 2. `TraceLayer` (request span with `request_id` and `customer_id` fields)
//! 3. Request ID (add unique ID to each request)
//! 4. Gateway credential (record the verified credential as an extension)

pub mod identity;
pub mod request_id;

pub use identity::{
    ADMIN_SCOPE, AdminScope, Caller, gateway_credential_middleware, resolve_caller_identity,
};
pub use request_id::request_id_middleware;
