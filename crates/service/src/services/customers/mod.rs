//! Customer resource manager.
//!
//! Enforces self-service authorization (a caller may only act on the
//! customer whose id equals their identity) and username/id uniqueness on
//! create. The store offers no transactions, so the uniqueness checks are a
//! check-then-write sequence: two concurrent creates with the same username
//! can both pass the check.
//!
//! The caller's own-record reads ([`CustomerService::list_own`] and
//! [`CustomerService::get_by_id`]) run behind the [`FallbackGuard`] and never
//! surface a store outage. Writes surface every failure.

mod error;

pub use error::CustomerError;

use customer_core::{CallerIdentity, Customer, CustomerId, CustomerPayload};
use tracing::{debug, info, instrument, warn};

use crate::db::{
    CustomerDocument, CustomerRepository, DatabaseInfo, DocumentStore, StoreError,
    StoreResultExt,
};
use crate::services::fallback::FallbackGuard;

/// Body of the bad-request outcome when no caller identity is present.
pub const MISSING_IDENTITY: &str = "Invalid Bearer Token: Missing customer ID";

/// Body of the bad-request outcome when a username is required but absent.
pub const MISSING_USERNAME: &str = "Missing username";

/// Customer resource manager.
///
/// Cheap to construct; build one per request from the shared store handle.
pub struct CustomerService<'a> {
    store: &'a dyn DocumentStore,
    customers: CustomerRepository<'a>,
    guard: FallbackGuard,
}

impl<'a> CustomerService<'a> {
    /// Create a new customer service over `store`.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, guard: FallbackGuard) -> Self {
        Self {
            store,
            customers: CustomerRepository::new(store),
            guard,
        }
    }

    /// Probe the store.
    ///
    /// # Errors
    ///
    /// Returns `CustomerError::Unavailable` or `CustomerError::Internal` if
    /// the probe fails.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<DatabaseInfo, CustomerError> {
        self.store
            .info()
            .await
            .map_err(|e| CustomerError::from_store("Store health check failed", &e))
    }

    /// Find every customer with the given username.
    ///
    /// Administrative: the caller's scope is checked before this is reached
    /// and no identity match is applied. The query is matched exactly as
    /// given, surrounding whitespace included.
    ///
    /// # Errors
    ///
    /// Returns `CustomerError::BadRequest` if `username` is absent or blank,
    /// or a store-derived error if the query fails.
    #[instrument(skip(self))]
    pub async fn search_by_username(
        &self,
        username: Option<&str>,
    ) -> Result<Vec<Customer>, CustomerError> {
        let username = username
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| CustomerError::BadRequest(MISSING_USERNAME.to_string()))?;

        self.customers
            .find_by_username(username)
            .await
            .and_then(|found| {
                found
                    .into_iter()
                    .map(CustomerDocument::into_customer)
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|e| CustomerError::from_store("Error searching customers", &e))
    }

    /// The caller's own customer record, as a list of at most one.
    ///
    /// A missing record, a failing store and a timed-out store all yield an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns `CustomerError::BadRequest` if there is no caller identity.
    #[instrument(skip(self))]
    pub async fn list_own(
        &self,
        caller: Option<&CallerIdentity>,
    ) -> Result<Vec<Customer>, CustomerError> {
        let caller = require_identity(caller)?;
        debug!(%caller, "Listing own customer record");

        let own = self
            .guard
            .with_fallback("list_own", self.find_own(caller.customer_id()), || Ok(None))
            .await
            .map_err(|e| CustomerError::from_store("Error listing customers", &e))?;

        Ok(own.into_iter().collect())
    }

    /// The caller's own customer record by id.
    ///
    /// # Errors
    ///
    /// - `CustomerError::BadRequest` if there is no caller identity
    /// - `CustomerError::Unauthorized` if `id` is not the caller's, whether or not it exists
    /// - `CustomerError::NotFound` if the record is missing or the store is failing
    #[instrument(skip(self))]
    pub async fn get_by_id(
        &self,
        caller: Option<&CallerIdentity>,
        id: &CustomerId,
    ) -> Result<Customer, CustomerError> {
        let caller = require_owner(caller, id)?;
        debug!(%caller, "Fetching own customer record");

        self.guard
            .with_fallback("get_by_id", self.find_own(id), || Ok(None))
            .await
            .map_err(|e| CustomerError::from_store("Error fetching customer", &e))?
            .ok_or_else(|| CustomerError::not_found(id))
    }

    /// Create a customer.
    ///
    /// Returns the id of the new document, assigned by the store if the
    /// payload did not carry one.
    ///
    /// # Errors
    ///
    /// - `CustomerError::BadRequest` if the payload has no username
    /// - `CustomerError::Conflict` if the id or the username is already taken
    /// - `CustomerError::Internal` / `CustomerError::Unavailable` on store failure
    #[instrument(skip(self, payload), fields(username = ?payload.username))]
    pub async fn create(&self, payload: CustomerPayload) -> Result<CustomerId, CustomerError> {
        const ACTION: &str = "Error creating customer";

        let username = payload
            .username()
            .map(str::to_owned)
            .ok_or_else(|| CustomerError::BadRequest(MISSING_USERNAME.to_string()))?;

        if let Some(id) = payload.supplied_id() {
            let taken = self
                .customers
                .exists(id)
                .await
                .map_err(|e| CustomerError::from_store(ACTION, &e))?;
            if taken {
                warn!(%id, "Rejected create: id already exists");
                return Err(id_taken(id));
            }
        }

        let same_name = self
            .customers
            .find_by_username(&username)
            .await
            .map_err(|e| CustomerError::from_store(ACTION, &e))?;
        if !same_name.is_empty() {
            warn!(%username, "Rejected create: username already exists");
            return Err(CustomerError::Conflict(format!(
                "Customer with name {username} already exists"
            )));
        }

        let document = CustomerDocument::from_payload(payload);
        let response = self.customers.save(&document).await.map_err(|e| match (&e, &document.id) {
            // Lost the race against a concurrent create with the same id.
            (StoreError::Conflict(_), Some(id)) => id_taken(id),
            _ => CustomerError::from_store(ACTION, &e),
        })?;

        if let Some(detail) = response.error_detail() {
            return Err(CustomerError::Internal(detail));
        }

        info!(id = %response.id, %username, "Customer created");
        Ok(CustomerId::new(response.id))
    }

    /// Replace the display attributes of the caller's own record.
    ///
    /// `customerId` and `username` in the payload are ignored.
    ///
    /// # Errors
    ///
    /// - `CustomerError::BadRequest` if there is no caller identity
    /// - `CustomerError::Unauthorized` if `id` is not the caller's
    /// - `CustomerError::NotFound` if the record does not exist
    /// - `CustomerError::Internal` / `CustomerError::Unavailable` on store failure
    #[instrument(skip(self, payload))]
    pub async fn update(
        &self,
        caller: Option<&CallerIdentity>,
        id: &CustomerId,
        payload: CustomerPayload,
    ) -> Result<(), CustomerError> {
        const ACTION: &str = "Error updating customer";

        let caller = require_owner(caller, id)?;
        info!(%caller, "Updating customer");

        let mut document = self
            .customers
            .get(id)
            .await
            .map_err(|e| CustomerError::from_lookup(id, ACTION, &e))?;

        document.apply_display_attributes(payload);

        let response = self
            .customers
            .save(&document)
            .await
            .map_err(|e| CustomerError::from_lookup(id, ACTION, &e))?;

        if let Some(detail) = response.error_detail() {
            return Err(CustomerError::Internal(format!("{ACTION}: {detail}")));
        }

        Ok(())
    }

    /// Delete the caller's own record.
    ///
    /// # Errors
    ///
    /// - `CustomerError::BadRequest` if there is no caller identity
    /// - `CustomerError::Unauthorized` if `id` is not the caller's
    /// - `CustomerError::NotFound` if the record does not exist (including a repeated delete)
    /// - `CustomerError::Internal` / `CustomerError::Unavailable` on store failure
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        caller: Option<&CallerIdentity>,
        id: &CustomerId,
    ) -> Result<(), CustomerError> {
        const ACTION: &str = "Error deleting customer";

        let caller = require_owner(caller, id)?;

        let document = self
            .customers
            .get(id)
            .await
            .map_err(|e| CustomerError::from_lookup(id, ACTION, &e))?;

        self.customers
            .remove(&document)
            .await
            .map_err(|e| CustomerError::from_lookup(id, ACTION, &e))?;

        info!(%caller, "Customer deleted");
        Ok(())
    }

    /// Primary read for the guarded paths: `None` when the record is absent.
    async fn find_own(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError> {
        self.customers
            .get(id)
            .await
            .optional()?
            .map(CustomerDocument::into_customer)
            .transpose()
    }
}

fn require_identity(caller: Option<&CallerIdentity>) -> Result<&CallerIdentity, CustomerError> {
    caller.ok_or_else(|| CustomerError::BadRequest(MISSING_IDENTITY.to_string()))
}

/// Require a caller identity that owns `id`.
///
/// The mismatch message does not depend on whether `id` exists.
fn require_owner<'c>(
    caller: Option<&'c CallerIdentity>,
    id: &CustomerId,
) -> Result<&'c CallerIdentity, CustomerError> {
    let caller = require_identity(caller)?;
    if !caller.owns(id) {
        warn!(%caller, requested = %id, "Rejected access to another customer's record");
        return Err(CustomerError::Unauthorized(
            "Caller may only access their own customer record".to_string(),
        ));
    }
    Ok(caller)
}

fn id_taken(id: &CustomerId) -> CustomerError {
    CustomerError::Conflict(format!("Id {id} already exists"))
}
