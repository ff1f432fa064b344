//! Catalog book served by the REST API

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Book record with a free-text author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    /// Title (max 200 characters)
    pub title: String,
    /// Author (max 100 characters)
    pub author: String,
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} by {}", self.title, self.author)
    }
}

/// Create or full-update request; both fields are required
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookPayload {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Author must be 1 to 100 characters"))]
    pub author: String,
}

/// Partial update request
///
/// An absent field keeps the stored value; an explicit `null` is rejected.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BookPatch {
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub title: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub author: Option<Option<String>>,
}

impl BookPatch {
    /// Apply the present fields on top of an existing book
    pub fn merge_into(&self, book: &Book) -> AppResult<BookPayload> {
        Ok(BookPayload {
            title: merge_field("title", &self.title, &book.title)?,
            author: merge_field("author", &self.author, &book.author)?,
        })
    }
}

fn merge_field(name: &str, patch: &Option<Option<String>>, stored: &str) -> AppResult<String> {
    match patch {
        None => Ok(stored.to_string()),
        Some(Some(value)) => Ok(value.clone()),
        Some(None) => Err(AppError::Validation(format!("{} may not be null", name))),
    }
}

/// List filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive match on title or author
    pub search: Option<String>,
    /// Exact author
    pub author: Option<String>,
}

impl BookQuery {
    /// In-process equivalent of the SQL filter
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(ref author) = self.author {
            if &book.author != author {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            return book.title.to_lowercase().contains(&needle)
                || book.author.to_lowercase().contains(&needle);
        }
        true
    }
}
