//! Authors, libraries and librarians of the relationship app

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
}

/// Book linked to an `Author` record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LibraryBook {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    /// Author name, joined in for display
    pub author_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Library {
    pub id: i32,
    pub name: String,
}

/// Library with its books, for the detail page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LibraryDetail {
    pub id: i32,
    pub name: String,
    pub books: Vec<LibraryBook>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Librarian {
    pub id: i32,
    pub name: String,
    pub library_id: i32,
}

/// Name-only request used to create authors, libraries and librarians
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NameRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
}

/// Put an existing book on a library's shelves
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ShelveBook {
    pub book_id: i32,
}

/// Add-book form
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLibraryBook {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(required(message = "Author is required"))]
    pub author_id: Option<i32>,
}

/// Edit-book form
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLibraryBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    pub author_id: Option<i32>,
}
