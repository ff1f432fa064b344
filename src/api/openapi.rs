//! OpenAPI documentation

use axum::{routing::get, Json, Router};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::api::{admin, books, health, token};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookshelf API",
        version = "1.0.0",
        description = "Book catalog REST API"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        token::obtain_auth_token,
        // Books
        books::list_books,
        books::list_all_books,
        books::create_book,
        books::retrieve_book,
        books::update_book,
        books::partial_update_book,
        books::destroy_book,
        // Administration
        admin::get_user,
        admin::set_user_role,
        admin::set_user_permissions,
        admin::create_author,
        admin::create_library,
        admin::shelve_book,
        admin::appoint_librarian,
    ),
    components(
        schemas(
            // Auth
            token::TokenResponse,
            crate::models::user::Credentials,
            // Books
            crate::models::catalog::Book,
            crate::models::catalog::BookPayload,
            crate::models::catalog::BookPatch,
            crate::models::catalog::BookQuery,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::Permission,
            crate::models::user::UserDetails,
            crate::models::user::UpdateRole,
            crate::models::user::UpdatePermissions,
            // Libraries
            crate::models::library::Author,
            crate::models::library::Library,
            crate::models::library::LibraryBook,
            crate::models::library::LibraryDetail,
            crate::models::library::Librarian,
            crate::models::library::NameRequest,
            crate::models::library::ShelveBook,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&TokenAuthScheme),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "API token endpoint"),
        (name = "books", description = "Catalog book management"),
        (name = "admin", description = "User and library administration")
    )
)]
pub struct ApiDoc;

/// `Authorization: Token <key>` header scheme
struct TokenAuthScheme;

impl Modify for TokenAuthScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token_auth",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
