//! Administration endpoints

use axum::http::StatusCode;
use bookshelf_server::models::user::Role;
use serde_json::json;

use crate::common::{get, json_body, json_request, TestApp, PASSWORD};

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let app = TestApp::new();
    let member = app.user("member", Some(Role::Member), &[]).await;
    let token = app.token("member").await;

    let response = app
        .send(get(&format!("/api/users/{}/", member.id), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(json_request(
            "POST",
            "/api/libraries/",
            Some(&token),
            &json!({ "name": "Central" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_manages_roles_and_permissions() {
    let app = TestApp::new();
    app.user("boss", Some(Role::Admin), &[]).await;
    let member = app.user("member", Some(Role::Member), &[]).await;
    let token = app.token("boss").await;

    let response = app
        .send(json_request(
            "PUT",
            &format!("/api/users/{}/role/", member.id),
            Some(&token),
            &json!({ "role": "Librarian" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["role"], "Librarian");

    let response = app
        .send(json_request(
            "PUT",
            &format!("/api/users/{}/permissions/", member.id),
            Some(&token),
            &json!({ "permissions": ["relationship_app.can_add_book", "bookshelf.can_view"] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["permissions"].as_array().unwrap().len(), 2);
    assert_eq!(body["username"], "member");
    assert!(body.get("password").is_none());

    let response = app
        .send(json_request(
            "PUT",
            &format!("/api/users/{}/role/", member.id),
            Some(&token),
            &json!({ "role": null }),
        ))
        .await;
    assert_eq!(json_body(response).await["role"], json!(null));
}

#[tokio::test]
async fn test_bootstrap_superuser_administers_libraries() {
    let app = TestApp::new();
    assert!(app
        .state
        .services
        .auth
        .ensure_superuser("root", PASSWORD)
        .await
        .unwrap());
    let token = app.token("root").await;

    let response = app
        .send(json_request("POST", "/api/libraries/", Some(&token), &json!({ "name": "Central" })))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let library_id = json_body(response).await["id"].as_i64().unwrap();

    let librarian = json!({ "name": "Alice" });
    let uri = format!("/api/libraries/{}/librarian/", library_id);
    let response = app
        .send(json_request("POST", &uri, Some(&token), &librarian))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(json_request("POST", &uri, Some(&token), &json!({ "name": "Bob" })))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = TestApp::new();

    let response = app.send(get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");

    let response = app.send(get("/ready", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(get("/api-docs/openapi.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
