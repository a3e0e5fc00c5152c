//! Integration tests for the customer service.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process server over the memory store
//! cargo test -p customer-integration-tests
//!
//! # Also run the CouchDB-backed tests
//! COUCHDB_URL=http://localhost:5984 COUCHDB_USERNAME=admin COUCHDB_PASSWORD=... \
//!     cargo test -p customer-integration-tests -- --include-ignored
//! ```
//!
//! [`TestServer`] binds the real router to an ephemeral port, so requests go
//! through the full middleware stack, gateway headers included.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use customer_service::config::ServiceConfig;
use customer_service::db::{DocumentStore, MemoryStore};
use customer_service::state::AppState;
use reqwest::{Client, RequestBuilder};

/// Store timeout used by test servers; short so hang scenarios finish fast.
pub const TEST_STORE_TIMEOUT_MS: u64 = 200;

/// A customer service running on a local ephemeral port.
pub struct TestServer {
    addr: SocketAddr,
    client: Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a server over a fresh in-memory store.
    ///
    /// Returns the store handle so tests can inject failures.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot bind.
    pub async fn start() -> (Self, MemoryStore) {
        let store = MemoryStore::new("customers");
        let server = Self::start_with(Arc::new(store.clone())).await;
        (server, store)
    }

    /// Start a server over an arbitrary store.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is rejected or the server cannot bind.
    pub async fn start_with(store: Arc<dyn DocumentStore>) -> Self {
        let timeout = TEST_STORE_TIMEOUT_MS.to_string();
        let config = ServiceConfig::from_lookup(|key| match key {
            "STORE_BACKEND" => Some("memory".to_string()),
            "STORE_TIMEOUT_MS" => Some(timeout.clone()),
            "CUSTOMER_PORT" => Some("0".to_string()),
            _ => None,
        })
        .unwrap_or_else(|e| panic!("test config rejected: {e}"));

        let listener = tokio::net::TcpListener::bind(config.socket_addr())
            .await
            .unwrap_or_else(|e| panic!("failed to bind test server: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("no local address: {e}"));

        let app = customer_service::app(AppState::new(&config, store));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            client: Client::new(),
            handle,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Unauthenticated request builder.
    #[must_use]
    pub fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Request builder carrying the gateway headers for an authenticated `principal`.
    #[must_use]
    pub fn as_caller(
        &self,
        method: reqwest::Method,
        path: &str,
        principal: &str,
        scopes: &[&str],
    ) -> RequestBuilder {
        self.request(method, path)
            .header("x-auth-principal", principal)
            .header("x-auth-scopes", scopes.join(" "))
            .header("x-auth-status", "authenticated")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
