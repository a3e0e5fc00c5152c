//! Customer repository for document store operations.
//!
//! This module maps between raw store documents and the customer types in
//! `customer-core`. Document ids are customer ids; the `_rev` bookkeeping
//! never leaves this layer.

use customer_core::{Customer, CustomerId, CustomerPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Document, DocumentStore, SaveResponse, Selector, StoreError, StoreResult};

/// A customer as persisted in the document store.
///
/// Fields the service does not know about are kept in `extra` so that an
/// overwrite does not drop them.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CustomerId>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub extra: Document,
}

impl std::fmt::Debug for CustomerDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerDocument")
            .field("id", &self.id)
            .field("rev", &self.rev)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl CustomerDocument {
    /// Build a new, unsaved document from a create payload.
    ///
    /// A blank payload id is dropped so the store assigns one.
    #[must_use]
    pub fn from_payload(payload: CustomerPayload) -> Self {
        let id = payload.supplied_id().cloned();
        Self {
            id,
            rev: None,
            username: payload.username().map(str::to_owned),
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            image_url: payload.image_url,
            password: payload.password,
            extra: Document::new(),
        }
    }

    /// Replace the display attributes with those from `payload`.
    ///
    /// `id` and `username` are left untouched whatever the payload says.
    pub fn apply_display_attributes(&mut self, payload: CustomerPayload) {
        self.first_name = payload.first_name;
        self.last_name = payload.last_name;
        self.image_url = payload.image_url;
        self.email = payload.email;
        self.password = payload.password;
    }

    /// Convert into the caller-facing view.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Internal` if the document carries no id.
    pub fn into_customer(self) -> StoreResult<Customer> {
        let customer_id = self
            .id
            .ok_or_else(|| StoreError::Internal("customer document without _id".to_string()))?;

        Ok(Customer {
            customer_id,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            image_url: self.image_url,
            password: self.password,
        })
    }

    fn from_document(document: Document) -> StoreResult<Self> {
        Ok(serde_json::from_value(Value::Object(document))?)
    }

    fn to_document(&self) -> StoreResult<Document> {
        match serde_json::to_value(self)? {
            Value::Object(document) => Ok(document),
            other => Err(StoreError::Internal(format!(
                "customer serialized to non-object: {other}"
            ))),
        }
    }
}

/// Repository for customer documents.
pub struct CustomerRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Whether a document exists at `id`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the check fails.
    pub async fn exists(&self, id: &CustomerId) -> StoreResult<bool> {
        self.store.contains(id.as_str()).await
    }

    /// Get the customer document at `id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if there is no such document,
    /// `StoreError::Serialization` if it is not a customer document,
    /// or any other store error.
    pub async fn get(&self, id: &CustomerId) -> StoreResult<CustomerDocument> {
        let document = self.store.get(id.as_str()).await?;
        CustomerDocument::from_document(document)
    }

    /// All customer documents whose username equals `username`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the query fails or a match cannot be decoded.
    pub async fn find_by_username(&self, username: &str) -> StoreResult<Vec<CustomerDocument>> {
        self.store
            .find(&Selector::field_equals("username", username))
            .await?
            .into_iter()
            .map(CustomerDocument::from_document)
            .collect()
    }

    /// Create or overwrite a customer document.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails outright. A store-reported
    /// per-document error comes back inside the `SaveResponse`.
    pub async fn save(&self, customer: &CustomerDocument) -> StoreResult<SaveResponse> {
        self.store.save(customer.to_document()?).await
    }

    /// Delete a previously fetched customer document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Internal` if the document was never saved,
    /// or the store error if the delete fails.
    pub async fn remove(&self, customer: &CustomerDocument) -> StoreResult<()> {
        let (Some(id), Some(rev)) = (&customer.id, &customer.rev) else {
            return Err(StoreError::Internal(
                "cannot remove an unsaved customer document".to_string(),
            ));
        };
        self.store.remove(id.as_str(), rev).await
    }
}
