//! Catalog book REST endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::catalog::{Book, BookPatch, BookPayload, BookQuery},
};

use super::TokenAuth;

/// List all books
#[utoipa::path(
    get,
    path = "/api/books/",
    tag = "books",
    security(("token_auth" = [])),
    responses(
        (status = 200, description = "All books ordered by title", body = Vec<Book>),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    TokenAuth(_caller): TokenAuth,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list(&BookQuery::default()).await?;
    Ok(Json(books))
}

/// List books with optional filters
#[utoipa::path(
    get,
    path = "/api/books_all/",
    tag = "books",
    security(("token_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>)
    )
)]
pub async fn list_all_books(
    State(state): State<crate::AppState>,
    TokenAuth(_caller): TokenAuth,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list(&query).await?;
    Ok(Json(books))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/api/books_all/",
    tag = "books",
    security(("token_auth" = [])),
    request_body = BookPayload,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    TokenAuth(principal): TokenAuth,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let Json(payload) = payload?;
    let book = state.services.catalog.create(payload).await?;
    tracing::info!(book_id = book.id, user_id = principal.user.id, "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/api/books_all/{id}/",
    tag = "books",
    security(("token_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn retrieve_book(
    State(state): State<crate::AppState>,
    TokenAuth(_caller): TokenAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    Ok(Json(state.services.catalog.get(id).await?))
}

/// Replace a book
#[utoipa::path(
    put,
    path = "/api/books_all/{id}/",
    tag = "books",
    security(("token_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookPayload,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    TokenAuth(_caller): TokenAuth,
    Path(id): Path<i32>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> AppResult<Json<Book>> {
    let Json(payload) = payload?;
    Ok(Json(state.services.catalog.update(id, payload).await?))
}

/// Update some fields of a book
#[utoipa::path(
    patch,
    path = "/api/books_all/{id}/",
    tag = "books",
    security(("token_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookPatch,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn partial_update_book(
    State(state): State<crate::AppState>,
    TokenAuth(_caller): TokenAuth,
    Path(id): Path<i32>,
    patch: Result<Json<BookPatch>, JsonRejection>,
) -> AppResult<Json<Book>> {
    let Json(patch) = patch?;
    Ok(Json(state.services.catalog.partial_update(id, patch).await?))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/api/books_all/{id}/",
    tag = "books",
    security(("token_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn destroy_book(
    State(state): State<crate::AppState>,
    TokenAuth(principal): TokenAuth,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete(id).await?;
    tracing::info!(book_id = id, user_id = principal.user.id, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}
