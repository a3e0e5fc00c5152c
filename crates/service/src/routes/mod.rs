//! HTTP route handlers for the customer service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness (always "ok")
//! GET    /check                      - Store connectivity check
//!
//! # Customers
//! GET    /customer/search?username=  - Search by username (admin scope)
//! GET    /customer                   - Caller's own record, as a list
//! POST   /customer                   - Create a customer
//! GET    /customer/{id}              - Caller's own record by id
//! PUT    /customer/{id}              - Update display attributes
//! DELETE /customer/{id}              - Delete the caller's own record
//! ```

pub mod customers;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(customers::list).post(customers::create))
        .route("/search", get(customers::search))
        .route(
            "/{id}",
            get(customers::show)
                .put(customers::update)
                .delete(customers::delete),
        )
}

/// Create all routes for the customer service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/check", get(customers::check))
        .nest("/customer", customer_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the store.
async fn health() -> &'static str {
    "ok"
}
