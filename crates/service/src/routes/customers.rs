//! Customer route handlers.
//!
//! Handlers are thin: they extract the caller, build a per-request
//! [`CustomerService`] over the shared store and map the outcome to HTTP.

use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use customer_core::{Customer, CustomerId, CustomerPayload};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{AdminScope, Caller};
use crate::services::{CustomerError, CustomerService};
use crate::state::AppState;

fn service(state: &AppState) -> CustomerService<'_> {
    CustomerService::new(state.store(), state.guard())
}

/// Query parameters for the username search.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub username: Option<String>,
}

/// Store connectivity check.
///
/// GET /check
#[instrument(skip(state))]
pub async fn check(State(state): State<AppState>) -> Result<&'static str> {
    service(&state).health_check().await?;
    Ok("It works!")
}

/// Administrative search across all customers.
///
/// GET /customer/search?username=
#[instrument(skip(state, admin), fields(principal = %admin.0.principal_name()))]
pub async fn search(
    State(state): State<AppState>,
    admin: AdminScope,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Customer>>> {
    let found = service(&state)
        .search_by_username(params.username.as_deref())
        .await?;
    Ok(Json(found))
}

/// The caller's own record as a list.
///
/// GET /customer
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<Customer>>> {
    let own = service(&state).list_own(caller.as_ref()).await?;
    Ok(Json(own))
}

/// Create a customer.
///
/// POST /customer
///
/// Responds 201 with `Location: {request path}/{id}`, the id as one
/// percent-encoded path segment.
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse> {
    let id = service(&state).create(payload).await?;
    add_breadcrumb("customer", "Created customer", Some(&[("customer_id", id.as_str())]));

    let location = location_for(uri.path(), &id).map_err(|reason| {
        AppError::from(CustomerError::Internal(format!(
            "Invalid Location for customer {id}: {reason}"
        )))
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers))
}

fn location_for(request_path: &str, id: &CustomerId) -> std::result::Result<HeaderValue, String> {
    let mut url = Url::parse("http://localhost").map_err(|e| e.to_string())?;
    url.set_path(request_path);
    url.path_segments_mut()
        .map_err(|()| "path cannot be a base".to_string())?
        .pop_if_empty()
        .push(id.as_str());
    HeaderValue::from_str(url.path()).map_err(|e| e.to_string())
}

/// GET /customer/{id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<CustomerId>,
) -> Result<Json<Customer>> {
    let customer = service(&state).get_by_id(caller.as_ref(), &id).await?;
    Ok(Json(customer))
}

/// PUT /customer/{id}
#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<CustomerId>,
    Json(payload): Json<CustomerPayload>,
) -> Result<StatusCode> {
    service(&state)
        .update(caller.as_ref(), &id, payload)
        .await?;
    Ok(StatusCode::OK)
}

/// DELETE /customer/{id}
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<CustomerId>,
) -> Result<StatusCode> {
    service(&state).delete(caller.as_ref(), &id).await?;
    add_breadcrumb("customer", "Deleted customer", Some(&[("customer_id", id.as_str())]));
    Ok(StatusCode::OK)
}
