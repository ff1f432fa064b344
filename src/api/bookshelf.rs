//! Bookshelf pages over the catalog books

use axum::{
    extract::{rejection::FormRejection, State},
    Form,
};
use serde_json::json;

use crate::{
    access::RequestContext,
    error::{AppError, AppResult},
    models::{catalog::BookPayload, catalog::BookQuery, user::Permission},
    AppState,
};

use super::pages::Page;

const FORM_TEMPLATE: &str = "bookshelf/form_example.html";

/// Requires `bookshelf.can_view`; answers 403 rather than redirecting
pub async fn book_list(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Page> {
    ctx.require_perm_or_forbid(Permission::CanView)?;
    let books = state.services.catalog.list(&BookQuery::default()).await?;
    Ok(Page::new("bookshelf/book_list.html", json!({ "books": books })).with_user(&ctx.identity))
}

pub async fn form_page(ctx: RequestContext) -> Page {
    Page::new(FORM_TEMPLATE, json!({ "errors": [] })).with_user(&ctx.identity)
}

/// Save a catalog book; invalid input re-renders the form with its errors
pub async fn submit_form(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Result<Form<BookPayload>, FormRejection>,
) -> AppResult<Page> {
    let Form(payload) = form?;
    let submitted = json!({ "title": payload.title, "author": payload.author });

    match state.services.catalog.create(payload).await {
        Ok(book) => Ok(Page::new(
            FORM_TEMPLATE,
            json!({ "message": "Saved securely", "book": book, "errors": [] }),
        )
        .with_user(&ctx.identity)),
        Err(AppError::Validation(message)) => Ok(Page::new(
            FORM_TEMPLATE,
            json!({ "form": submitted, "errors": [message] }),
        )
        .with_user(&ctx.identity)),
        Err(e) => Err(e),
    }
}
