//! Shared helpers: an app over the memory store and request shortcuts

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use bookshelf_server::{
    api,
    config::AppConfig,
    models::{
        library::NameRequest,
        user::{Permission, Registration, Role, User},
    },
    repository::Repository,
    AppState,
};

pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::new(AppConfig::default(), Repository::in_memory());
        let router = api::create_router(state.clone());
        Self { router, state }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Register a user, then assign the role and permissions
    pub async fn user(&self, username: &str, role: Option<Role>, permissions: &[Permission]) -> User {
        let user = self
            .state
            .services
            .auth
            .register(Registration {
                username: username.to_string(),
                password1: PASSWORD.to_string(),
                password2: PASSWORD.to_string(),
            })
            .await
            .expect("register user");
        self.state
            .services
            .users
            .set_role(user.id, role)
            .await
            .expect("set role");
        self.state
            .services
            .users
            .set_permissions(user.id, permissions)
            .await
            .expect("set permissions");
        user
    }

    /// `Cookie` header value for a signed-in user
    pub fn session_cookie(&self, user: &User) -> String {
        let session = self
            .state
            .services
            .auth
            .issue_session(user)
            .expect("issue session");
        format!("{}={}", api::SESSION_COOKIE, session)
    }

    pub async fn token(&self, username: &str) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/api-token-auth/",
                None,
                &serde_json::json!({ "username": username, "password": PASSWORD }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn author(&self, name: &str) -> i32 {
        self.state
            .services
            .library
            .create_author(NameRequest { name: name.to_string() })
            .await
            .expect("create author")
            .id
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {}", token));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn page(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

pub fn form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}
