//! Catalog book storage

use async_trait::async_trait;

use super::PgStore;
use crate::{
    error::{AppError, AppResult},
    models::catalog::{Book, BookPayload, BookQuery},
};

/// Storage for the REST catalog books
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// List books ordered by title, applying the query filters
    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>>;

    /// Get a book by ID
    async fn get(&self, id: i32) -> AppResult<Book>;

    async fn create(&self, book: &BookPayload) -> AppResult<Book>;

    /// Replace both fields of an existing book
    async fn update(&self, id: i32, book: &BookPayload) -> AppResult<Book>;

    async fn delete(&self, id: i32) -> AppResult<()>;

    async fn count(&self) -> AppResult<i64>;
}

/// Escape `LIKE` wildcards so the search matches literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref search) = query.search {
            params.push(format!("%{}%", escape_like(&search.to_lowercase())));
            conditions.push(format!(
                r"(LOWER(title) LIKE ${} ESCAPE '\' OR LOWER(author) LIKE ${} ESCAPE '\')",
                params.len(),
                params.len()
            ));
        }

        if let Some(ref author) = query.author {
            params.push(author.clone());
            conditions.push(format!("author = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_query = format!(
            "SELECT id, title, author FROM api_books {} ORDER BY title, id",
            where_clause
        );

        let mut builder = sqlx::query_as::<_, Book>(&select_query);
        for param in &params {
            builder = builder.bind(param);
        }

        Ok(builder.fetch_all(&self.pool).await?)
    }

    async fn get(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT id, title, author FROM api_books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    async fn create(&self, book: &BookPayload) -> AppResult<Book> {
        let row = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO api_books (title, author)
            VALUES ($1, $2)
            RETURNING id, title, author
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i32, book: &BookPayload) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE api_books SET title = $1, author = $2
            WHERE id = $3
            RETURNING id, title, author
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM api_books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
