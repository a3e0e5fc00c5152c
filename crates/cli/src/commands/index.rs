//! Username index commands.
//!
//! # Usage
//!
//! ```bash
//! customer-cli index ensure
//! ```
//!
//! The service ensures the index at startup as well; this command lets a
//! deploy pipeline create it before the first instance starts.
//!
//! # Environment Variables
//!
//! - `COUCHDB_URL` - Server base URL
//! - `COUCHDB_DATABASE` - Database name (default: customers)
//! - `COUCHDB_USERNAME` / `COUCHDB_PASSWORD` - Basic auth credentials

use customer_service::db::{IndexStatus, USERNAME_INDEX_ID, ensure_username_index};

use super::{CommandError, connect_from_env};

/// Create the username search index if it is missing.
///
/// # Errors
///
/// Returns an error if the store is misconfigured or the index cannot be created.
pub async fn ensure() -> Result<(), CommandError> {
    let store = connect_from_env()?;

    tracing::info!("Ensuring {USERNAME_INDEX_ID}...");
    match ensure_username_index(store.as_ref()).await? {
        IndexStatus::Created => tracing::info!("Username index created"),
        IndexStatus::AlreadyPresent => tracing::info!("Username index already present"),
    }

    Ok(())
}
