//! Store connectivity check.

use super::{CommandError, connect_from_env};

/// Probe the configured store and log its database info.
///
/// # Errors
///
/// Returns an error if the store is misconfigured or unreachable.
pub async fn run() -> Result<(), CommandError> {
    let store = connect_from_env()?;
    let info = store.info().await?;

    tracing::info!(
        database = %info.db_name,
        documents = info.doc_count,
        deleted = info.doc_del_count,
        "Store reachable"
    );
    Ok(())
}
