//! Administration endpoints: user roles, permissions and library records
//!
//! Every handler needs a token belonging to a superuser or an Admin profile.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        library::{Author, Librarian, Library, LibraryDetail, NameRequest, ShelveBook},
        user::{UpdatePermissions, UpdateRole, UserDetails},
    },
};

use super::TokenAuth;

/// Get a user with role and permissions
#[utoipa::path(
    get,
    path = "/api/users/{id}/",
    tag = "admin",
    security(("token_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserDetails),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    TokenAuth(principal): TokenAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<UserDetails>> {
    principal.require_admin()?;
    Ok(Json(state.services.users.get_details(id).await?))
}

/// Set or remove a user's profile role
#[utoipa::path(
    put,
    path = "/api/users/{id}/role/",
    tag = "admin",
    security(("token_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role updated", body = UserDetails),
        (status = 403, description = "Caller is not an administrator")
    )
)]
pub async fn set_user_role(
    State(state): State<crate::AppState>,
    TokenAuth(principal): TokenAuth,
    Path(id): Path<i32>,
    request: Result<Json<UpdateRole>, JsonRejection>,
) -> AppResult<Json<UserDetails>> {
    principal.require_admin()?;
    let Json(request) = request?;
    Ok(Json(state.services.users.set_role(id, request.role).await?))
}

/// Replace a user's permissions
#[utoipa::path(
    put,
    path = "/api/users/{id}/permissions/",
    tag = "admin",
    security(("token_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdatePermissions,
    responses(
        (status = 200, description = "Permissions updated", body = UserDetails),
        (status = 403, description = "Caller is not an administrator")
    )
)]
pub async fn set_user_permissions(
    State(state): State<crate::AppState>,
    TokenAuth(principal): TokenAuth,
    Path(id): Path<i32>,
    request: Result<Json<UpdatePermissions>, JsonRejection>,
) -> AppResult<Json<UserDetails>> {
    principal.require_admin()?;
    let Json(request) = request?;
    let details = state
        .services
        .users
        .set_permissions(id, &request.permissions)
        .await?;
    Ok(Json(details))
}

/// Create an author
#[utoipa::path(
    post,
    path = "/api/authors/",
    tag = "admin",
    security(("token_auth" = [])),
    request_body = NameRequest,
    responses(
        (status = 201, description = "Author created", body = Author)
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    TokenAuth(principal): TokenAuth,
    request: Result<Json<NameRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Author>)> {
    principal.require_admin()?;
    let Json(request) = request?;
    let author = state.services.library.create_author(request).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// Create a library
#[utoipa::path(
    post,
    path = "/api/libraries/",
    tag = "admin",
    security(("token_auth" = [])),
    request_body = NameRequest,
    responses(
        (status = 201, description = "Library created", body = Library)
    )
)]
pub async fn create_library(
    State(state): State<crate::AppState>,
    TokenAuth(principal): TokenAuth,
    request: Result<Json<NameRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Library>)> {
    principal.require_admin()?;
    let Json(request) = request?;
    let library = state.services.library.create_library(request).await?;
    Ok((StatusCode::CREATED, Json(library)))
}

/// Put a book on a library's shelves
#[utoipa::path(
    post,
    path = "/api/libraries/{id}/books/",
    tag = "admin",
    security(("token_auth" = [])),
    params(("id" = i32, Path, description = "Library ID")),
    request_body = ShelveBook,
    responses(
        (status = 200, description = "Library with its books", body = LibraryDetail),
        (status = 404, description = "Library or book not found")
    )
)]
pub async fn shelve_book(
    State(state): State<crate::AppState>,
    TokenAuth(principal): TokenAuth,
    Path(id): Path<i32>,
    request: Result<Json<ShelveBook>, JsonRejection>,
) -> AppResult<Json<LibraryDetail>> {
    principal.require_admin()?;
    let Json(request) = request?;
    Ok(Json(state.services.library.shelve_book(id, request.book_id).await?))
}

/// Appoint the librarian of a library
#[utoipa::path(
    post,
    path = "/api/libraries/{id}/librarian/",
    tag = "admin",
    security(("token_auth" = [])),
    params(("id" = i32, Path, description = "Library ID")),
    request_body = NameRequest,
    responses(
        (status = 201, description = "Librarian appointed", body = Librarian),
        (status = 409, description = "Library already has a librarian")
    )
)]
pub async fn appoint_librarian(
    State(state): State<crate::AppState>,
    TokenAuth(principal): TokenAuth,
    Path(id): Path<i32>,
    request: Result<Json<NameRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Librarian>)> {
    principal.require_admin()?;
    let Json(request) = request?;
    let librarian = state.services.library.appoint_librarian(id, request).await?;
    Ok((StatusCode::CREATED, Json(librarian)))
}
