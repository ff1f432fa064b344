//! Session pages: role gates, permission-gated actions and query helpers

use axum::http::{header, StatusCode};
use bookshelf_server::models::{
    library::{CreateLibraryBook, NameRequest},
    user::{Permission, Role},
};
use serde_json::{json, Value};

use crate::common::{form, json_body, location, page, text_body, TestApp, PASSWORD};

#[tokio::test]
async fn test_anonymous_is_sent_to_login() {
    let app = TestApp::new();

    for path in ["/relationship/admin/", "/relationship/librarian/", "/relationship/member/"] {
        let response = app.send(page("GET", path, None)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            location(&response),
            format!("/relationship/login/?next={}", path)
        );
    }
}

#[tokio::test]
async fn test_each_role_sees_only_its_view() {
    let app = TestApp::new();
    let librarian = app.user("lib", Some(Role::Librarian), &[]).await;
    let cookie = app.session_cookie(&librarian);

    let response = app
        .send(page("GET", "/relationship/librarian/", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["template"], "relationship_app/librarian_view.html");
    assert_eq!(body["context"]["user"], "lib");

    for path in ["/relationship/admin/", "/relationship/member/"] {
        let response = app.send(page("GET", path, Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }
}

#[tokio::test]
async fn test_user_without_profile_is_denied() {
    let app = TestApp::new();
    let user = app.user("ghost", None, &[]).await;
    let cookie = app.session_cookie(&user);

    let response = app
        .send(page("GET", "/relationship/member/", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_login_sets_session_and_follows_next() {
    let app = TestApp::new();
    app.user("member", Some(Role::Member), &[]).await;

    let response = app
        .send(form(
            "/relationship/login/",
            None,
            &format!("username=member&password={}&next=/relationship/member/", PASSWORD),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/relationship/member/");
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie")
        .to_string();
    assert!(set_cookie.starts_with("sessionid="));
    assert!(set_cookie.contains("HttpOnly"));

    let cookie = set_cookie.split(';').next().unwrap().to_string();
    let response = app
        .send(page("GET", "/relationship/member/", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_ignores_external_next() {
    let app = TestApp::new();
    app.user("member", Some(Role::Member), &[]).await;

    let response = app
        .send(form(
            "/relationship/login/",
            None,
            &format!("username=member&password={}&next=https://evil.example/", PASSWORD),
        ))
        .await;
    assert_eq!(location(&response), "/relationship/books/");
}

#[tokio::test]
async fn test_login_ignores_next_with_control_characters() {
    let app = TestApp::new();
    app.user("member", Some(Role::Member), &[]).await;

    for next in ["/%0A", "/%09/evil.example"] {
        let response = app
            .send(form(
                "/relationship/login/",
                None,
                &format!("username=member&password={}&next={}", PASSWORD, next),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/relationship/books/");
    }
}

#[tokio::test]
async fn test_bad_login_re_renders_form() {
    let app = TestApp::new();
    app.user("member", Some(Role::Member), &[]).await;

    let response = app
        .send(form("/relationship/login/", None, "username=member&password=nope"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let body = json_body(response).await;
    assert_eq!(body["template"], "relationship_app/login.html");
    assert_eq!(body["context"]["errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_creates_member() {
    let app = TestApp::new();

    let response = app
        .send(form(
            "/relationship/register/",
            None,
            &format!("username=newcomer&password1={0}&password2={0}", PASSWORD),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/relationship/books/");
    assert!(response.headers().get(header::SET_COOKIE).is_some());

    let response = app
        .send(form(
            "/relationship/register/",
            None,
            &format!("username=NEWCOMER&password1={0}&password2={0}", PASSWORD),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["template"], "relationship_app/register.html");
}

#[tokio::test]
async fn test_register_password_mismatch() {
    let app = TestApp::new();

    let response = app
        .send(form(
            "/relationship/register/",
            None,
            "username=newcomer&password1=first-password&password2=second-password",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(!body["context"]["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();
    let user = app.user("member", Some(Role::Member), &[]).await;
    let cookie = app.session_cookie(&user);

    let response = app
        .send(page("POST", "/relationship/logout/", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("removal cookie")
        .to_string();
    assert!(set_cookie.starts_with("sessionid="));
    assert_eq!(json_body(response).await["template"], "relationship_app/logout.html");
}

#[tokio::test]
async fn test_add_book_needs_permission() {
    let app = TestApp::new();
    let author = app.author("Ursula K. Le Guin").await;
    let body = format!("title=The+Dispossessed&author_id={}", author);

    let response = app.send(form("/relationship/add_book/", None, &body)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/relationship/login/?next=/relationship/add_book/");

    let user = app.user("plain", Some(Role::Member), &[]).await;
    let cookie = app.session_cookie(&user);
    let response = app
        .send(form("/relationship/add_book/", Some(&cookie), &body))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(app.state.services.library.list_books().await.unwrap().is_empty());

    let editor = app
        .user("editor", Some(Role::Librarian), &[Permission::CanAddBook])
        .await;
    let cookie = app.session_cookie(&editor);
    let response = app
        .send(form("/relationship/add_book/", Some(&cookie), &body))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_body(response).await, "Book added successfully.");

    let books = app.state.services.library.list_books().await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].author_name, "Ursula K. Le Guin");
}

#[tokio::test]
async fn test_add_book_with_unknown_author() {
    let app = TestApp::new();
    let editor = app
        .user("editor", Some(Role::Librarian), &[Permission::CanAddBook])
        .await;
    let cookie = app.session_cookie(&editor);

    let response = app
        .send(form("/relationship/add_book/", Some(&cookie), "title=Orphan&author_id=999"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_book_forms() {
    let app = TestApp::new();
    let author = app.author("Italo Calvino").await;
    let book = app
        .state
        .services
        .library
        .add_book(CreateLibraryBook {
            title: "Invisible Cities".to_string(),
            author_id: Some(author),
        })
        .await
        .unwrap();

    let editor = app
        .user(
            "editor",
            Some(Role::Librarian),
            &[Permission::CanAddBook, Permission::CanChangeBook],
        )
        .await;
    let cookie = app.session_cookie(&editor);

    let response = app
        .send(form("/relationship/add_book/", Some(&cookie), "title=Orphan&author_id=abc"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(form(
            &format!("/relationship/edit_book/{}/", book.id),
            Some(&cookie),
            "author_id=abc",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(form(
            &format!("/relationship/edit_book/{}/", book.id),
            Some(&cookie),
            "author_id=999",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let books = app.state.services.library.list_books().await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].author_id, author);
    assert_eq!(books[0].title, "Invisible Cities");
}

#[tokio::test]
async fn test_edit_and_delete_book() {
    let app = TestApp::new();
    let author = app.author("Italo Calvino").await;
    let book = app
        .state
        .services
        .library
        .add_book(CreateLibraryBook {
            title: "Invisible Cities".to_string(),
            author_id: Some(author),
        })
        .await
        .unwrap();

    let editor = app
        .user(
            "editor",
            Some(Role::Librarian),
            &[Permission::CanChangeBook, Permission::CanDeleteBook],
        )
        .await;
    let cookie = app.session_cookie(&editor);

    let response = app
        .send(form(
            &format!("/relationship/edit_book/{}/", book.id),
            Some(&cookie),
            "title=Le+citta+invisibili",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_body(response).await, "Book edited successfully.");

    let response = app
        .send(form("/relationship/edit_book/999/", Some(&cookie), "title=Nothing"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(page("POST", &format!("/relationship/delete_book/{}/", book.id), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_body(response).await, "Book deleted successfully.");

    let response = app
        .send(page("POST", &format!("/relationship/delete_book/{}/", book.id), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_query_helpers_soft_miss() {
    let app = TestApp::new();

    let response = app
        .send(page("GET", "/relationship/authors/Nobody/books/", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));

    let response = app
        .send(page("GET", "/relationship/libraries/Nowhere/books/", None))
        .await;
    assert_eq!(json_body(response).await, json!([]));

    let response = app
        .send(page("GET", "/relationship/libraries/Nowhere/librarian/", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, Value::Null);
}

#[tokio::test]
async fn test_query_helpers_find_records() {
    let app = TestApp::new();
    let library = &app.state.services.library;
    let author = app.author("Jorge Luis Borges").await;
    let book = library
        .add_book(CreateLibraryBook {
            title: "Ficciones".to_string(),
            author_id: Some(author),
        })
        .await
        .unwrap();
    let branch = library
        .create_library(NameRequest { name: "Central".to_string() })
        .await
        .unwrap();
    library.shelve_book(branch.id, book.id).await.unwrap();
    library
        .appoint_librarian(branch.id, NameRequest { name: "Alice".to_string() })
        .await
        .unwrap();

    let response = app
        .send(page("GET", "/relationship/authors/Jorge%20Luis%20Borges/books/", None))
        .await;
    assert_eq!(json_body(response).await[0]["title"], "Ficciones");

    let response = app
        .send(page("GET", "/relationship/libraries/Central/books/", None))
        .await;
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

    let response = app
        .send(page("GET", "/relationship/libraries/Central/librarian/", None))
        .await;
    assert_eq!(json_body(response).await["name"], "Alice");

    let response = app
        .send(page("GET", &format!("/relationship/library/{}/", branch.id), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["template"], "relationship_app/library_detail.html");
    assert_eq!(body["context"]["library"]["books"][0]["title"], "Ficciones");
    assert_eq!(body["context"]["user"], Value::Null);
}

#[tokio::test]
async fn test_missing_library_detail() {
    let app = TestApp::new();
    let response = app.send(page("GET", "/relationship/library/42/", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
