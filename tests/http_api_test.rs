use axum_test::TestServer;
use http::StatusCode;
use serde_json::{json, Value};

mod common;

async fn server() -> TestServer {
    let app = common::setup_test_app().await.unwrap();
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_list_all_users() {
    let server = server().await;

    let response = server.get("/realms/acme/users").await;
    response.assert_status(StatusCode::OK);

    let users: Vec<Value> = response.json();
    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|u| u["id"].is_string()));
}

#[tokio::test]
async fn test_search_and_paging_parameters() {
    let server = server().await;

    let users: Vec<Value> = server
        .get("/realms/acme/users")
        .add_query_param("search", "bob")
        .await
        .json();
    assert_eq!(users.len(), 3);

    let users: Vec<Value> = server
        .get("/realms/acme/users")
        .add_query_param("search", "bob")
        .add_query_param("page", "1")
        .add_query_param("size", "2")
        .await
        .json();
    assert_eq!(users.len(), 1);

    let users: Vec<Value> = server
        .get("/realms/acme/users")
        .add_query_param("username", "BOB_1")
        .add_query_param("exact", "true")
        .await
        .json();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["firstName"], "Bob");
}

#[tokio::test]
async fn test_invalid_page_size() {
    let server = server().await;
    let response = server
        .get("/realms/acme/users")
        .add_query_param("size", "ten")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_count_users() {
    let server = server().await;

    let body: Value = server.get("/realms/acme/users/count").await.json();
    assert_eq!(body, json!({ "count": 4 }));

    let body: Value = server
        .get("/realms/acme/users/count")
        .add_query_param("search", "%")
        .await
        .json();
    assert_eq!(body, json!({ "count": 1 }));
}

#[tokio::test]
async fn test_get_user_by_id() {
    let server = server().await;

    let response = server.get("/realms/acme/users/1").await;
    response.assert_status(StatusCode::OK);
    let user: Value = response.json();
    assert_eq!(user["username"], "ALICE");
    assert_eq!(user["email"], "alice@example.com");

    let bobby: Value = server.get("/realms/acme/users/3").await.json();
    assert!(bobby.get("email").is_none());

    server
        .get("/realms/acme/users/42")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_user_by_username_and_email() {
    let server = server().await;

    let user: Value = server
        .get("/realms/acme/users/by-username/CAROL")
        .await
        .json();
    assert_eq!(user["id"], "4");

    let user: Value = server
        .get("/realms/acme/users/by-email/BOB@EXAMPLE.COM")
        .await
        .json();
    assert_eq!(user["username"], "BOB_1");

    server
        .get("/realms/acme/users/by-email/nobody@example.com")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_realm() {
    let server = server().await;
    let response = server.get("/realms/nowhere/users").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("nowhere"));
}

#[tokio::test]
async fn test_delete_reports_policy_only() {
    let server = server().await;

    let body: Value = server.delete("/realms/acme/users/1").await.json();
    assert_eq!(body, json!({ "removed": true }));

    let body: Value = server.delete("/realms/legacy/users/1").await.json();
    assert_eq!(body, json!({ "removed": false }));

    server
        .get("/realms/acme/users/1")
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_validate_credentials() {
    let server = server().await;

    let body: Value = server
        .post("/realms/acme/credentials/validate")
        .json(&json!({ "username": "ALICE", "password": "alice-secret" }))
        .await
        .json();
    assert_eq!(body, json!({ "valid": true }));

    let body: Value = server
        .post("/realms/acme/credentials/validate")
        .json(&json!({ "username": "ALICE", "password": "guess" }))
        .await
        .json();
    assert_eq!(body, json!({ "valid": false }));
}

#[tokio::test]
async fn test_update_credentials() {
    let server = server().await;

    let body: Value = server
        .put("/realms/acme/credentials")
        .json(&json!({ "username": "CAROL", "password": "new-secret" }))
        .await
        .json();
    assert_eq!(body, json!({ "updated": true }));

    let body: Value = server
        .post("/realms/acme/credentials/validate")
        .json(&json!({ "username": "CAROL", "password": "new-secret" }))
        .await
        .json();
    assert_eq!(body, json!({ "valid": true }));
}

#[tokio::test]
async fn test_update_credentials_not_supported() {
    let server = server().await;

    server
        .put("/realms/legacy/credentials")
        .json(&json!({ "username": "CAROL", "password": "new-secret" }))
        .await
        .assert_status(StatusCode::NOT_IMPLEMENTED);

    server
        .put("/realms/acme/credentials")
        .json(&json!({ "username": "CAROL", "password": "" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
