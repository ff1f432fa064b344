//! HTTP handlers, request extractors and the router

pub mod admin;
pub mod books;
pub mod bookshelf;
pub mod health;
pub mod openapi;
pub mod pages;
pub mod relationship;
pub mod token;

use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::CookieJar;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    access::{Principal, RequestContext},
    error::AppError,
    AppState,
};

/// Name of the session cookie set by the login page
pub const SESSION_COOKIE: &str = "sessionid";

/// Extractor for REST callers presenting `Authorization: Token <key>`
pub struct TokenAuth(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for TokenAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Authentication("Authentication credentials were not provided".to_string())
            })?;

        let key = parse_token_header(auth_header)
            .ok_or_else(|| AppError::Authentication("Invalid token header".to_string()))?;

        let principal = state.services.auth.principal_for_token(key).await?;
        Ok(TokenAuth(principal))
    }
}

/// Key from `Token <key>`; the keyword is case-insensitive
fn parse_token_header(value: &str) -> Option<&str> {
    let (keyword, key) = value.trim().split_once(' ')?;
    let key = key.trim();
    if !keyword.eq_ignore_ascii_case("token") || key.is_empty() || key.contains(' ') {
        return None;
    }
    Some(key)
}

/// Page handlers get the session identity resolved once; never rejects an
/// anonymous caller.
#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string());

        let identity = state
            .services
            .auth
            .identity_from_session(session.as_deref())
            .await?;

        // Nested routers see a stripped URI; `next` needs the full one
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Ok(RequestContext { identity, path })
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // REST API (token authentication)
    let api = Router::new()
        .route("/api-token-auth/", post(token::obtain_auth_token))
        .route("/api/books/", get(books::list_books))
        .route(
            "/api/books_all/",
            get(books::list_all_books).post(books::create_book),
        )
        .route(
            "/api/books_all/:id/",
            get(books::retrieve_book)
                .put(books::update_book)
                .patch(books::partial_update_book)
                .delete(books::destroy_book),
        )
        // Administration
        .route("/api/users/:id/", get(admin::get_user))
        .route("/api/users/:id/role/", put(admin::set_user_role))
        .route("/api/users/:id/permissions/", put(admin::set_user_permissions))
        .route("/api/authors/", post(admin::create_author))
        .route("/api/libraries/", post(admin::create_library))
        .route("/api/libraries/:id/books/", post(admin::shelve_book))
        .route("/api/libraries/:id/librarian/", post(admin::appoint_librarian));

    // Relationship app pages (session authentication)
    let relationship = Router::new()
        .route("/books/", get(relationship::list_books))
        .route("/library/:id/", get(relationship::library_detail))
        .route("/login/", get(relationship::login_page).post(relationship::login))
        .route("/logout/", get(relationship::logout).post(relationship::logout))
        .route(
            "/register/",
            get(relationship::register_page).post(relationship::register),
        )
        .route("/admin/", get(relationship::admin_view))
        .route("/librarian/", get(relationship::librarian_view))
        .route("/member/", get(relationship::member_view))
        .route("/add_book/", post(relationship::add_book))
        .route("/edit_book/:pk/", post(relationship::edit_book))
        .route("/delete_book/:pk/", post(relationship::delete_book))
        .route("/authors/:name/books/", get(relationship::books_by_author))
        .route("/libraries/:name/books/", get(relationship::books_in_library))
        .route(
            "/libraries/:name/librarian/",
            get(relationship::librarian_for_library),
        );

    let bookshelf = Router::new()
        .route("/books/", get(bookshelf::book_list))
        .route("/form/", get(bookshelf::form_page).post(bookshelf::submit_form));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .merge(api)
        .nest("/relationship", relationship)
        .nest("/bookshelf", bookshelf)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
