//! End-to-end tests for the customer API.
//!
//! Each test starts its own server over a fresh in-memory store; the store
//! handle is used to simulate outages and hangs.

#![allow(clippy::unwrap_used)]

use customer_integration_tests::TestServer;
use customer_service::db::Failure;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

async fn create(server: &TestServer, body: Value) -> reqwest::Response {
    server
        .request(Method::POST, "/customer")
        .json(&body)
        .send()
        .await
        .unwrap()
}

// ============================================================================
// Self-service flow
// ============================================================================

#[tokio::test]
async fn test_self_service_lifecycle() {
    let (server, _store) = TestServer::start().await;

    let resp = create(
        &server,
        json!({ "customerId": "A1", "username": "alice", "firstName": "Alice", "password": "pw" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers()["location"], "/customer/A1");

    // Own record, password never echoed.
    let resp = server
        .as_caller(Method::GET, "/customer/A1", "A1", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["customerId"], "A1");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["firstName"], "Alice");
    assert!(body.get("password").is_none());

    let resp = server
        .as_caller(Method::GET, "/customer", "A1", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["customerId"], "A1");

    // Update may not rename.
    let resp = server
        .as_caller(Method::PUT, "/customer/A1", "A1", &[])
        .json(&json!({ "customerId": "B2", "username": "mallory", "firstName": "Alicia" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = server
        .as_caller(Method::GET, "/customer/A1", "A1", &[])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["firstName"], "Alicia");

    let resp = server
        .as_caller(Method::DELETE, "/customer/A1", "A1", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server
        .as_caller(Method::DELETE, "/customer/A1", "A1", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.text().await.unwrap(), "Customer with ID A1 not found");
}

#[tokio::test]
async fn test_store_assigns_id_when_absent() {
    let (server, _store) = TestServer::start().await;

    let resp = create(&server, json!({ "username": "carol" })).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let location = resp.headers()["location"].to_str().unwrap().to_string();
    let id = location.strip_prefix("/customer/").unwrap();
    assert!(!id.is_empty());

    let resp = server
        .as_caller(Method::GET, &location, id, &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_cross_customer_access_is_unauthorized() {
    let (server, _store) = TestServer::start().await;
    create(&server, json!({ "customerId": "A1", "username": "alice" })).await;

    for path in ["/customer/A1", "/customer/Z9"] {
        let resp = server
            .as_caller(Method::GET, path, "B2", &[])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "GET {path}");
    }

    let resp = server
        .as_caller(Method::PUT, "/customer/A1", "B2", &[])
        .json(&json!({ "firstName": "Eve" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .as_caller(Method::DELETE, "/customer/A1", "B2", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_or_unverified_identity_is_bad_request() {
    let (server, _store) = TestServer::start().await;

    let resp = server
        .request(Method::GET, "/customer/A1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.text().await.unwrap(),
        "Invalid Bearer Token: Missing customer ID"
    );

    // Principal present but the gateway did not verify it.
    let resp = server
        .request(Method::GET, "/customer")
        .header("x-auth-principal", "A1")
        .header("x-auth-status", "expired")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Uniqueness
// ============================================================================

#[tokio::test]
async fn test_duplicates_are_rejected() {
    let (server, _store) = TestServer::start().await;
    create(&server, json!({ "customerId": "A1", "username": "alice" })).await;

    let resp = create(&server, json!({ "customerId": "A1", "username": "bob" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "Id A1 already exists");

    let resp = create(&server, json!({ "customerId": "C3", "username": "alice" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.text().await.unwrap(),
        "Customer with name alice already exists"
    );

    let resp = create(&server, json!({ "firstName": "Nameless" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "Missing username");
}

// ============================================================================
// Administrative search
// ============================================================================

#[tokio::test]
async fn test_search_by_username() {
    let (server, _store) = TestServer::start().await;
    create(&server, json!({ "customerId": "A1", "username": "alice" })).await;
    create(&server, json!({ "customerId": "B2", "username": "bob" })).await;

    let resp = server
        .as_caller(Method::GET, "/customer/search?username=alice", "A1", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = server
        .as_caller(Method::GET, "/customer/search?username=alice", "ops", &["admin"])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let found: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["customerId"], "A1");

    let resp = server
        .as_caller(Method::GET, "/customer/search", "ops", &["admin"])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Degraded store
// ============================================================================

#[tokio::test]
async fn test_outage_degrades_reads_and_fails_writes() {
    let (server, store) = TestServer::start().await;
    create(&server, json!({ "customerId": "A1", "username": "alice" })).await;

    store.fail_with(Some(Failure::Outage));

    let resp = server
        .as_caller(Method::GET, "/customer", "A1", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "[]");

    let resp = server
        .as_caller(Method::GET, "/customer/A1", "A1", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = create(&server, json!({ "username": "bob" })).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = server
        .request(Method::GET, "/check")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    store.fail_with(None);
    let resp = server
        .as_caller(Method::GET, "/customer/A1", "A1", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_hung_store_degrades_reads() {
    let (server, store) = TestServer::start().await;
    create(&server, json!({ "customerId": "A1", "username": "alice" })).await;

    store.fail_with(Some(Failure::Hang));

    let resp = server
        .as_caller(Method::GET, "/customer", "A1", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "[]");

    let resp = server
        .as_caller(Method::GET, "/customer/A1", "A1", &[])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Plumbing
// ============================================================================

#[tokio::test]
async fn test_health_and_request_id() {
    let (server, _store) = TestServer::start().await;

    let resp = server
        .request(Method::GET, "/health")
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-request-id"], "req-123");
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = server.request(Method::GET, "/check").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "It works!");
}
