//! In-memory document store.
//!
//! [`MemoryStore`] mirrors the `CouchDB` semantics the service relies on:
//! store-assigned ids, revision-checked overwrites and deletes, and
//! single-field selector queries. It is intended for local development
//! (`STORE_BACKEND=memory`) and tests.
//!
//! Failures can be injected with [`MemoryStore::fail_with`] to exercise the
//! degraded paths without a real outage.
//!
//! # Cloning
//!
//! `MemoryStore` is cheaply cloneable via [`Arc`]. All clones share the same
//! documents and failure mode.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use super::{
    DatabaseInfo, Document, DocumentStore, ID_FIELD, REV_FIELD, SaveResponse, Selector,
    StoreError, StoreResult,
};

/// A simulated store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Every call fails immediately with `StoreError::Unavailable`.
    Outage,
    /// Every call waits forever, as if the store stopped answering.
    Hang,
}

/// In-memory document store keyed by `_id`.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

struct MemoryStoreInner {
    name: String,
    documents: RwLock<BTreeMap<String, Document>>,
    failure: RwLock<Option<Failure>>,
    revisions: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store reporting `name` as its database name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MemoryStoreInner {
                name: name.into(),
                documents: RwLock::new(BTreeMap::new()),
                failure: RwLock::new(None),
                revisions: AtomicU64::new(0),
            }),
        }
    }

    /// Make every subsequent call fail in the given way, or `None` to recover.
    pub fn fail_with(&self, failure: Option<Failure>) {
        *self.inner.failure.write() = failure;
    }

    /// Number of stored documents, design documents included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.documents.read().len()
    }

    /// Whether the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.documents.read().is_empty()
    }

    /// Apply the injected failure, if any.
    async fn check_failure(&self) -> StoreResult<()> {
        let failure = *self.inner.failure.read();
        match failure {
            None => Ok(()),
            Some(Failure::Outage) => Err(StoreError::Unavailable("simulated outage".to_string())),
            Some(Failure::Hang) => std::future::pending().await,
        }
    }

    fn next_revision(&self, previous: Option<&str>) -> String {
        let generation = previous
            .and_then(|rev| rev.split_once('-'))
            .and_then(|(n, _)| n.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        let counter = self.inner.revisions.fetch_add(1, Ordering::Relaxed);
        format!("{generation}-{counter:08x}")
    }
}

fn rev_of(document: &Document) -> Option<&str> {
    document.get(REV_FIELD).and_then(Value::as_str)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn info(&self) -> StoreResult<DatabaseInfo> {
        self.check_failure().await?;

        Ok(DatabaseInfo {
            db_name: self.inner.name.clone(),
            doc_count: self.len() as u64,
            doc_del_count: 0,
        })
    }

    async fn contains(&self, id: &str) -> StoreResult<bool> {
        self.check_failure().await?;

        Ok(self.inner.documents.read().contains_key(id))
    }

    async fn get(&self, id: &str) -> StoreResult<Document> {
        self.check_failure().await?;

        self.inner
            .documents
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))
    }

    async fn save(&self, mut document: Document) -> StoreResult<SaveResponse> {
        self.check_failure().await?;

        let id = match document.get(ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::String(_) | Value::Null) | None => Uuid::new_v4().simple().to_string(),
            Some(other) => {
                return Ok(SaveResponse {
                    id: other.to_string(),
                    error: Some("bad_request".to_string()),
                    reason: Some("Document id must be a string".to_string()),
                    ..SaveResponse::default()
                });
            }
        };

        let mut documents = self.inner.documents.write();
        let current_rev = documents.get(&id).and_then(rev_of).map(str::to_owned);
        if current_rev.as_deref() != rev_of(&document) {
            return Err(StoreError::Conflict("Document update conflict.".to_string()));
        }

        let rev = self.next_revision(current_rev.as_deref());
        document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        document.insert(REV_FIELD.to_string(), Value::String(rev.clone()));
        documents.insert(id.clone(), document);

        Ok(SaveResponse {
            id,
            rev: Some(rev),
            error: None,
            reason: None,
        })
    }

    async fn remove(&self, id: &str, rev: &str) -> StoreResult<()> {
        self.check_failure().await?;

        let mut documents = self.inner.documents.write();
        let current = documents
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        if rev_of(current) != Some(rev) {
            return Err(StoreError::Conflict("Document update conflict.".to_string()));
        }

        documents.remove(id);
        Ok(())
    }

    async fn find(&self, selector: &Selector) -> StoreResult<Vec<Document>> {
        self.check_failure().await?;

        Ok(self
            .inner
            .documents
            .read()
            .iter()
            .filter(|(id, _)| !id.starts_with("_design/"))
            .filter(|(_, document)| selector.matches(document))
            .map(|(_, document)| document.clone())
            .collect())
    }
}
