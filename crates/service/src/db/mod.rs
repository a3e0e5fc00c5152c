//! Document store access for the customer service.
//!
//! # Store: CouchDB-compatible (`customers` database by default)
//!
//! ## Documents
//!
//! - customer documents - one per customer, keyed by `_id` (the customer id)
//! - `_design/username_searchIndex` - text index over `username`, created at startup
//!
//! The store is eventually consistent and offers no multi-document
//! transactions. Every write is a full overwrite guarded only by the
//! document revision.
//!
//! # Backends
//!
//! - [`CouchStore`] - HTTP client for `CouchDB` / Cloudant
//! - [`MemoryStore`] - in-process store for development and tests
//!
//! The index can also be created out of band via:
//! ```bash
//! cargo run -p customer-cli -- index ensure
//! ```

pub mod couch;
pub mod customers;
pub mod index;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};

pub use couch::CouchStore;
pub use customers::{CustomerDocument, CustomerRepository};
pub use index::{IndexStatus, USERNAME_INDEX_ID, ensure_username_index};
pub use memory::{Failure, MemoryStore};

/// A raw JSON document as held by the store.
pub type Document = Map<String, Value>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Document field holding the document id.
pub const ID_FIELD: &str = "_id";

/// Document field holding the document revision.
pub const REV_FIELD: &str = "_rev";

/// Errors that can occur during store operations.
///
/// `NotFound` is kept apart from every other failure so callers can branch
/// on it without inspecting messages.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists at the requested id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Revision mismatch or document already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer in time.
    #[error("store request timed out")]
    Timeout,

    /// The store answered with an error the client does not model.
    #[error("store rejected request ({status}): {error}: {reason}")]
    Rejected {
        status: u16,
        error: String,
        reason: String,
    },

    /// A document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else, including misconfiguration.
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether this error means the document does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error means the store itself is unreachable or slow.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

/// Extension for turning a not-found lookup into `None`.
pub trait StoreResultExt<T> {
    /// Map `Err(StoreError::NotFound)` to `Ok(None)`, leaving other errors intact.
    ///
    /// # Errors
    ///
    /// Returns every error other than `StoreError::NotFound` unchanged.
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Database metadata returned by the store's info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub db_name: String,
    #[serde(default)]
    pub doc_count: u64,
    #[serde(default)]
    pub doc_del_count: u64,
}

/// Outcome of a save.
///
/// A store may accept the request but still report a per-document error;
/// that case is carried in `error`/`reason` rather than as an `Err`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub rev: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl SaveResponse {
    /// Human-readable error reported by the store, if any.
    #[must_use]
    pub fn error_detail(&self) -> Option<String> {
        self.error.as_ref().map(|error| match &self.reason {
            Some(reason) => format!("{error}: {reason}"),
            None => error.clone(),
        })
    }
}

/// Single-field equality selector.
///
/// Serialized as a Mango selector (`{"field": value}`), never built by
/// string concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    field: String,
    value: Value,
}

impl Selector {
    /// Match documents whose `field` equals `value`.
    #[must_use]
    pub fn field_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// The selector as a Mango query object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut selector = Map::new();
        selector.insert(self.field.clone(), self.value.clone());
        Value::Object(selector)
    }

    /// Whether `document` satisfies the selector.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// Operations the service consumes from a document store.
///
/// Implementations own their connection handling and timeouts. None of them
/// retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lightweight database probe.
    async fn info(&self) -> StoreResult<DatabaseInfo>;

    /// Whether a document exists at `id`.
    async fn contains(&self, id: &str) -> StoreResult<bool>;

    /// Fetch the document at `id`, or `StoreError::NotFound`.
    async fn get(&self, id: &str) -> StoreResult<Document>;

    /// Create or overwrite a document.
    ///
    /// Without `_id` the store assigns one. Overwrites must carry the current `_rev`.
    async fn save(&self, document: Document) -> StoreResult<SaveResponse>;

    /// Delete the document at `id` with revision `rev`.
    async fn remove(&self, id: &str, rev: &str) -> StoreResult<()>;

    /// All documents matching `selector`.
    async fn find(&self, selector: &Selector) -> StoreResult<Vec<Document>>;
}

/// Build the configured store backend.
///
/// # Errors
///
/// Returns `StoreError::Internal` if the backend configuration is unusable
/// (for example a malformed store URL).
pub fn connect(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    match &config.backend {
        StoreBackend::CouchDb(couch) => {
            let store = CouchStore::new(couch, config.timeout)?;
            tracing::info!(database = %couch.database, "Using CouchDB document store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new("customers")))
        }
    }
}
