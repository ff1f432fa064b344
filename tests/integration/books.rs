//! REST CRUD over catalog books

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;

use crate::common::{get, json_body, json_request, TestApp};

#[tokio::test]
async fn test_list_requires_token() {
    let app = TestApp::new();

    let response = app.send(get("/api/books/", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert!(body.get("id").is_none());
    assert_eq!(body["error"], "NotAuthenticated");

    let response = app.send(get("/api/books_all/", Some("not-a-real-token"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok()),
        Some("Token")
    );
}

#[tokio::test]
async fn test_token_keyword_is_case_insensitive() {
    let app = TestApp::new();
    app.user("reader", None, &[]).await;
    let token = app.token("reader").await;

    let request = Request::builder()
        .uri("/api/books/")
        .header(header::AUTHORIZATION, format!("token {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_empty_list_is_an_empty_array() {
    let app = TestApp::new();
    app.user("reader", None, &[]).await;
    let token = app.token("reader").await;

    let response = app.send(get("/api/books/", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn test_token_is_reused() {
    let app = TestApp::new();
    app.user("reader", None, &[]).await;

    let first = app.token("reader").await;
    let second = app.token("reader").await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 40);
}

#[tokio::test]
async fn test_token_with_bad_credentials() {
    let app = TestApp::new();
    app.user("reader", None, &[]).await;

    let response = app
        .send(json_request(
            "POST",
            "/api-token-auth/",
            None,
            &json!({ "username": "reader", "password": "wrong-password" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await.get("token").is_none());
}

#[tokio::test]
async fn test_crud_cycle() {
    let app = TestApp::new();
    app.user("reader", None, &[]).await;
    let token = app.token("reader").await;

    let response = app
        .send(json_request(
            "POST",
            "/api/books_all/",
            Some(&token),
            &json!({ "title": "Dune", "author": "Frank Herbert" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["title"], "Dune");

    let response = app
        .send(json_request(
            "POST",
            "/api/books_all/",
            Some(&token),
            &json!({ "title": "Hyperion", "author": "Dan Simmons" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let kept = json_body(response).await;
    let kept_id = kept["id"].as_i64().expect("id");

    let response = app
        .send(get(&format!("/api/books_all/{}/", id), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, created);

    let response = app
        .send(json_request(
            "PATCH",
            &format!("/api/books_all/{}/", id),
            Some(&token),
            &json!({ "title": "Dune Messiah" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let patched = json_body(response).await;
    assert_eq!(patched["title"], "Dune Messiah");
    assert_eq!(patched["author"], "Frank Herbert");

    let response = app
        .send(json_request(
            "PUT",
            &format!("/api/books_all/{}/", id),
            Some(&token),
            &json!({ "title": "Children of Dune" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.state.services.catalog.count().await.unwrap(), 2);
    let response = app
        .send(json_request(
            "DELETE",
            &format!("/api/books_all/{}/", id),
            Some(&token),
            &json!({}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.state.services.catalog.count().await.unwrap(), 1);

    let response = app
        .send(get(&format!("/api/books_all/{}/", id), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(get(&format!("/api/books_all/{}/", kept_id), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, kept);
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let app = TestApp::new();
    app.user("reader", None, &[]).await;
    let token = app.token("reader").await;

    for body in [
        json!({ "title": null, "author": null }),
        json!({ "title": 5, "author": "Someone" }),
    ] {
        let response = app
            .send(json_request("POST", "/api/books_all/", Some(&token), &body))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "BadValue");
    }

    let request = Request::builder()
        .method("POST")
        .uri("/api/books_all/")
        .header(header::AUTHORIZATION, format!("Token {}", token))
        .body(Body::from(r#"{"title":"Dune","author":"Frank Herbert"}"#))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.state.services.catalog.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_patch_rejects_explicit_null() {
    let app = TestApp::new();
    app.user("reader", None, &[]).await;
    let token = app.token("reader").await;

    let response = app
        .send(json_request(
            "POST",
            "/api/books_all/",
            Some(&token),
            &json!({ "title": "Dune", "author": "Frank Herbert" }),
        ))
        .await;
    let id = json_body(response).await["id"].as_i64().expect("id");

    let response = app
        .send(json_request(
            "PATCH",
            &format!("/api/books_all/{}/", id),
            Some(&token),
            &json!({ "title": null }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(get(&format!("/api/books_all/{}/", id), Some(&token)))
        .await;
    assert_eq!(json_body(response).await["title"], "Dune");
}

#[tokio::test]
async fn test_invalid_create_stores_nothing() {
    let app = TestApp::new();
    app.user("reader", None, &[]).await;
    let token = app.token("reader").await;

    for body in [
        json!({}),
        json!({ "title": "", "author": "Someone" }),
        json!({ "title": "x".repeat(201), "author": "Someone" }),
        json!({ "title": "Title", "author": "a".repeat(101) }),
    ] {
        let response = app
            .send(json_request("POST", "/api/books_all/", Some(&token), &body))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    assert_eq!(app.state.services.catalog.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_filters() {
    let app = TestApp::new();
    app.user("reader", None, &[]).await;
    let token = app.token("reader").await;

    for (title, author) in [("Emma", "Jane Austen"), ("Persuasion", "Jane Austen"), ("Ulysses", "James Joyce")] {
        let response = app
            .send(json_request(
                "POST",
                "/api/books_all/",
                Some(&token),
                &json!({ "title": title, "author": author }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .send(get("/api/books_all/?author=Jane%20Austen", Some(&token)))
        .await;
    let titles: Vec<String> = json_body(response)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Emma", "Persuasion"]);

    let response = app.send(get("/api/books_all/?search=ULY", Some(&token))).await;
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
}
