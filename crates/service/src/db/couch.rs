//! `CouchDB` / Cloudant HTTP client.
//!
//! Speaks the plain `CouchDB` document API with `reqwest`:
//!
//! ```text
//! GET    /{db}               - database info
//! HEAD   /{db}/{id}          - existence check
//! GET    /{db}/{id}          - fetch document
//! PUT    /{db}/{id}          - create/overwrite document with known id
//! POST   /{db}               - create document, server assigns id
//! DELETE /{db}/{id}?rev=     - delete document
//! POST   /{db}/_find         - Mango selector query
//! ```
//!
//! Every request is bounded by the configured store timeout. There are no
//! retries; a failed request surfaces as a [`StoreError`] immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use super::{
    DatabaseInfo, Document, DocumentStore, ID_FIELD, SaveResponse, Selector, StoreError,
    StoreResult,
};
use crate::config::CouchDbConfig;

/// Mango queries return 25 rows unless told otherwise.
const FIND_LIMIT: u32 = 10_000;

/// Error body returned by `CouchDB` on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct CouchErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    docs: Vec<Document>,
    #[serde(default)]
    warning: Option<String>,
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() || e.is_request() {
            Self::Unavailable(e.to_string())
        } else if e.is_decode() {
            Self::Internal(format!("undecodable store response: {e}"))
        } else {
            Self::Internal(e.to_string())
        }
    }
}

/// Document store client for a single `CouchDB` database.
#[derive(Clone)]
pub struct CouchStore {
    client: reqwest::Client,
    database_url: Url,
    username: Option<String>,
    password: Option<SecretString>,
}

impl CouchStore {
    /// Create a client for the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Internal` if the URL is not a valid base URL or
    /// the HTTP client cannot be built.
    pub fn new(config: &CouchDbConfig, timeout: Duration) -> StoreResult<Self> {
        let mut database_url = Url::parse(&config.url)
            .map_err(|e| StoreError::Internal(format!("invalid store url: {e}")))?;
        database_url
            .path_segments_mut()
            .map_err(|()| StoreError::Internal("store url cannot be a base".to_string()))?
            .pop_if_empty()
            .push(&config.database);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            database_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// URL of the document `id`.
    ///
    /// Design document ids keep their `/` separator; every other id is a
    /// single, percent-encoded path segment.
    fn document_url(&self, id: &str) -> StoreResult<Url> {
        match id.strip_prefix("_design/") {
            Some(name) => self.database_path(&["_design", name]),
            None => self.database_path(&[id]),
        }
    }

    fn database_path(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.database_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Internal("store url cannot be a base".to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match &self.username {
            Some(username) => builder.basic_auth(
                username,
                self.password.as_ref().map(ExposeSecret::expose_secret),
            ),
            None => builder,
        }
    }
}

/// Convert a non-success response into a [`StoreError`].
async fn error_from_response(response: Response) -> StoreError {
    let status = response.status();
    let body: CouchErrorBody = response.json().await.unwrap_or_default();

    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(body.reason),
        StatusCode::CONFLICT => StoreError::Conflict(body.reason),
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            StoreError::Unavailable(format!("{status}: {}", body.reason))
        }
        StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => StoreError::Timeout,
        _ => StoreError::Rejected {
            status: status.as_u16(),
            error: body.error,
            reason: body.reason,
        },
    }
}

#[async_trait]
impl DocumentStore for CouchStore {
    #[instrument(skip(self))]
    async fn info(&self) -> StoreResult<DatabaseInfo> {
        let response = self
            .request(Method::GET, self.database_url.clone())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    async fn contains(&self, id: &str) -> StoreResult<bool> {
        let response = self
            .request(Method::HEAD, self.document_url(id)?)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(error_from_response(response).await),
        }
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> StoreResult<Document> {
        let response = self
            .request(Method::GET, self.document_url(id)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(match error_from_response(response).await {
                StoreError::NotFound(_) => StoreError::NotFound(id.to_owned()),
                other => other,
            });
        }

        Ok(response.json().await?)
    }

    #[instrument(skip(self, document))]
    async fn save(&self, document: Document) -> StoreResult<SaveResponse> {
        let request = match document.get(ID_FIELD).and_then(Value::as_str) {
            Some(id) => self.request(Method::PUT, self.document_url(id)?),
            None => self.request(Method::POST, self.database_url.clone()),
        };

        let response = request.json(&document).send().await?;

        if response.status().is_success() {
            let saved: SaveResponse = response.json().await?;
            debug!(id = %saved.id, "Document saved");
            return Ok(saved);
        }

        match error_from_response(response).await {
            StoreError::Rejected { error, reason, .. } => Ok(SaveResponse {
                id: document
                    .get(ID_FIELD)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                rev: None,
                error: Some(error),
                reason: Some(reason),
            }),
            other => Err(other),
        }
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &str, rev: &str) -> StoreResult<()> {
        let mut url = self.document_url(id)?;
        url.query_pairs_mut().append_pair("rev", rev);

        let response = self.request(Method::DELETE, url).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, selector: &Selector) -> StoreResult<Vec<Document>> {
        let body = json!({
            "selector": selector.to_json(),
            "limit": FIND_LIMIT,
        });

        let response = self
            .request(Method::POST, self.database_path(&["_find"])?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let found: FindResponse = response.json().await?;
        if let Some(warning) = &found.warning {
            debug!(%warning, "Store reported query warning");
        }

        Ok(found.docs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(url: &str) -> CouchDbConfig {
        CouchDbConfig {
            url: url.to_string(),
            database: "customers".to_string(),
            username: Some("service".to_string()),
            password: Some(SecretString::from("k3Jq9!vTz@8mWp")),
        }
    }

    #[test]
    fn test_database_url_joins_database_name() {
        let store = CouchStore::new(&config("http://localhost:5984"), Duration::from_secs(1)).unwrap();
        assert_eq!(store.database_url.as_str(), "http://localhost:5984/customers");

        let store = CouchStore::new(&config("https://example.cloudant.com/"), Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.database_url.as_str(),
            "https://example.cloudant.com/customers"
        );
    }

    #[test]
    fn test_document_url_encodes_ids() {
        let store = CouchStore::new(&config("http://localhost:5984"), Duration::from_secs(1)).unwrap();

        assert_eq!(
            store.document_url("A1").unwrap().as_str(),
            "http://localhost:5984/customers/A1"
        );
        assert_eq!(
            store.document_url("a/b").unwrap().as_str(),
            "http://localhost:5984/customers/a%2Fb"
        );
        assert_eq!(
            store.document_url("_design/username_searchIndex").unwrap().as_str(),
            "http://localhost:5984/customers/_design/username_searchIndex"
        );
    }

    #[test]
    fn test_requests_carry_basic_auth() {
        let store = CouchStore::new(&config("http://localhost:5984"), Duration::from_secs(1)).unwrap();
        let request = store
            .request(Method::GET, store.database_url.clone())
            .build()
            .unwrap();

        assert_eq!(
            request.headers()["authorization"],
            "Basic c2VydmljZTprM0pxOSF2VHpAOG1XcA=="
        );

        let anonymous = CouchStore::new(
            &CouchDbConfig {
                username: None,
                password: None,
                ..config("http://localhost:5984")
            },
            Duration::from_secs(1),
        )
        .unwrap();
        let request = anonymous
            .request(Method::GET, anonymous.database_url.clone())
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_rejects_non_base_url() {
        let result = CouchStore::new(&config("mailto:ops@example.com"), Duration::from_secs(1));
        assert!(matches!(result, Err(StoreError::Internal(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Port 9 (discard) is closed on loopback in test environments.
        let store = CouchStore::new(&config("http://127.0.0.1:9"), Duration::from_secs(2)).unwrap();

        let err = store.info().await.unwrap_err();
        assert!(err.is_unavailable(), "unexpected error: {err:?}");
    }
}
