//! Relationship app pages: listings, authentication, role views and book actions

use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    response::{IntoResponse, Response},
    Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;

use crate::{
    access::{is_admin, is_librarian, is_member, RequestContext},
    error::{AppError, AppResult},
    models::{
        library::{CreateLibraryBook, Librarian, LibraryBook, UpdateLibraryBook},
        user::{Permission, Registration, User},
    },
    AppState,
};

use super::{
    pages::{found, is_safe_redirect, Page},
    SESSION_COOKIE,
};

/// Where users land after login and registration
pub const LOGIN_REDIRECT_URL: &str = "/relationship/books/";

/// List all books
pub async fn list_books(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Page> {
    let books = state.services.library.list_books().await?;
    Ok(Page::new("relationship_app/list_books.html", json!({ "books": books })).with_user(&ctx.identity))
}

/// Library detail with its books
pub async fn library_detail(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<Page> {
    let library = state.services.library.library_detail(id).await?;
    Ok(Page::new("relationship_app/library_detail.html", json!({ "library": library }))
        .with_user(&ctx.identity))
}

#[derive(Debug, Default, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

pub async fn login_page(ctx: RequestContext, Query(params): Query<NextParam>) -> Page {
    Page::new(
        "relationship_app/login.html",
        json!({ "next": params.next, "errors": [] }),
    )
    .with_user(&ctx.identity)
}

/// Sign in and set the session cookie; bad credentials re-render the form
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let user = match state.services.auth.authenticate(&form.username, &form.password).await {
        Ok(user) => user,
        Err(AppError::Authentication(_)) => {
            tracing::debug!(username = %form.username, "Login rejected");
            return Ok(Page::new(
                "relationship_app/login.html",
                json!({
                    "next": form.next,
                    "username": form.username,
                    "errors": ["Please enter a correct username and password. Note that both fields may be case-sensitive."],
                    "user": null,
                }),
            )
            .into_response());
        }
        Err(e) => return Err(e),
    };

    let destination = form
        .next
        .as_deref()
        .filter(|next| is_safe_redirect(next))
        .unwrap_or(LOGIN_REDIRECT_URL);

    let jar = start_session(&state, jar, &user)?;
    Ok((jar, found(destination)).into_response())
}

/// Clear the session cookie
pub async fn logout(jar: CookieJar) -> (CookieJar, Page) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (
        jar,
        Page::new("relationship_app/logout.html", json!({ "user": null })),
    )
}

pub async fn register_page(ctx: RequestContext) -> Page {
    Page::new("relationship_app/register.html", json!({ "errors": [] })).with_user(&ctx.identity)
}

/// Create an account, sign it in and go to the book list
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<Registration>,
) -> AppResult<Response> {
    let username = form.username.clone();
    let user = match state.services.auth.register(form).await {
        Ok(user) => user,
        Err(AppError::Validation(message)) => {
            return Ok(Page::new(
                "relationship_app/register.html",
                json!({ "username": username, "errors": [message], "user": null }),
            )
            .into_response());
        }
        Err(e) => return Err(e),
    };

    let jar = start_session(&state, jar, &user)?;
    Ok((jar, found(LOGIN_REDIRECT_URL)).into_response())
}

fn start_session(state: &AppState, jar: CookieJar, user: &User) -> AppResult<CookieJar> {
    let session = state.services.auth.issue_session(user)?;
    let cookie = Cookie::build((SESSION_COOKIE, session))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    Ok(jar.add(cookie))
}

pub async fn admin_view(ctx: RequestContext) -> AppResult<Page> {
    ctx.require(is_admin, "admin view")?;
    Ok(Page::new("relationship_app/admin_view.html", json!({})).with_user(&ctx.identity))
}

pub async fn librarian_view(ctx: RequestContext) -> AppResult<Page> {
    ctx.require(is_librarian, "librarian view")?;
    Ok(Page::new("relationship_app/librarian_view.html", json!({})).with_user(&ctx.identity))
}

pub async fn member_view(ctx: RequestContext) -> AppResult<Page> {
    ctx.require(is_member, "member view")?;
    Ok(Page::new("relationship_app/member_view.html", json!({})).with_user(&ctx.identity))
}

/// Requires `relationship_app.can_add_book`
pub async fn add_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Result<Form<CreateLibraryBook>, FormRejection>,
) -> AppResult<&'static str> {
    ctx.require_perm(Permission::CanAddBook)?;
    state.services.library.add_book(form?.0).await?;
    Ok("Book added successfully.")
}

/// Requires `relationship_app.can_change_book`
pub async fn edit_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(pk): Path<i32>,
    form: Result<Form<UpdateLibraryBook>, FormRejection>,
) -> AppResult<&'static str> {
    ctx.require_perm(Permission::CanChangeBook)?;
    state.services.library.edit_book(pk, form?.0).await?;
    Ok("Book edited successfully.")
}

/// Requires `relationship_app.can_delete_book`
pub async fn delete_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(pk): Path<i32>,
) -> AppResult<&'static str> {
    ctx.require_perm(Permission::CanDeleteBook)?;
    state.services.library.delete_book(pk).await?;
    Ok("Book deleted successfully.")
}

pub async fn books_by_author(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Vec<LibraryBook>>> {
    Ok(Json(state.services.library.books_by_author(&name).await?))
}

pub async fn books_in_library(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Vec<LibraryBook>>> {
    Ok(Json(state.services.library.books_in_library(&name).await?))
}

/// Answers `null` when the library or its librarian is missing
pub async fn librarian_for_library(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Option<Librarian>>> {
    Ok(Json(state.services.library.librarian_for_library(&name).await?))
}
