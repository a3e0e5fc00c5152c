//! Username search index bootstrap.
//!
//! The privileged username search relies on a text index over
//! `doc.username`. The index lives in a design document that is created
//! once, before the service accepts traffic.

use serde_json::{Value, json};
use tracing::{info, instrument};

use super::{Document, DocumentStore, StoreError, StoreResult};

/// Id of the design document holding the username index.
pub const USERNAME_INDEX_ID: &str = "_design/username_searchIndex";

/// Name of the index group inside the design document.
pub const USERNAME_INDEX_GROUP: &str = "usernames";

/// What [`ensure_username_index`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// The design document was already present; nothing was written.
    AlreadyPresent,
    /// The design document was created.
    Created,
}

/// The design document defining the username index.
#[must_use]
pub fn username_index_document() -> Document {
    let definition = json!({
        "_id": USERNAME_INDEX_ID,
        "indexes": {
            USERNAME_INDEX_GROUP: {
                "index": "function(doc){index(\"usernames\", doc.username); }"
            }
        }
    });

    match definition {
        Value::Object(document) => document,
        _ => Document::new(),
    }
}

/// Create the username index if it does not exist yet.
///
/// Safe to call repeatedly; once the index exists this is a single
/// existence check.
///
/// # Errors
///
/// Returns the store error if the check or the write fails, or
/// `StoreError::Internal` if the store rejected the design document.
/// Startup treats any error as fatal.
#[instrument(skip(store))]
pub async fn ensure_username_index(store: &dyn DocumentStore) -> StoreResult<IndexStatus> {
    if store.contains(USERNAME_INDEX_ID).await? {
        info!(index = USERNAME_INDEX_ID, "Username index already present");
        return Ok(IndexStatus::AlreadyPresent);
    }

    let response = match store.save(username_index_document()).await {
        Ok(response) => response,
        // Another instance created it between our check and our write.
        Err(StoreError::Conflict(_)) => return Ok(IndexStatus::AlreadyPresent),
        Err(e) => return Err(e),
    };

    if let Some(detail) = response.error_detail() {
        return Err(StoreError::Internal(format!(
            "failed to create {USERNAME_INDEX_ID}: {detail}"
        )));
    }

    info!(index = USERNAME_INDEX_ID, "Username index created");
    Ok(IndexStatus::Created)
}
