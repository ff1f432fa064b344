//! Authors, books, libraries and librarians

use async_trait::async_trait;

use super::PgStore;
use crate::{
    error::{AppError, AppResult},
    models::library::{Author, Librarian, Library, LibraryBook},
};

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author_id, a.name AS author_name
    FROM books b
    JOIN authors a ON a.id = b.author_id
"#;

#[async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn authors_create(&self, name: &str) -> AppResult<Author>;

    async fn authors_get(&self, id: i32) -> AppResult<Author>;

    /// All books ordered by ID
    async fn books_list(&self) -> AppResult<Vec<LibraryBook>>;

    async fn books_get(&self, id: i32) -> AppResult<LibraryBook>;

    async fn books_create(&self, title: &str, author_id: i32) -> AppResult<LibraryBook>;

    /// Update the given fields; `None` keeps the stored value
    async fn books_update(
        &self,
        id: i32,
        title: Option<&str>,
        author_id: Option<i32>,
    ) -> AppResult<LibraryBook>;

    async fn books_delete(&self, id: i32) -> AppResult<()>;

    /// Books written by every author carrying this name
    async fn books_by_author_name(&self, name: &str) -> AppResult<Vec<LibraryBook>>;

    async fn libraries_create(&self, name: &str) -> AppResult<Library>;

    async fn libraries_get(&self, id: i32) -> AppResult<Library>;

    /// First library with this name, if any
    async fn libraries_find_by_name(&self, name: &str) -> AppResult<Option<Library>>;

    async fn libraries_books(&self, library_id: i32) -> AppResult<Vec<LibraryBook>>;

    /// Link a book to a library; linking twice is a no-op
    async fn libraries_add_book(&self, library_id: i32, book_id: i32) -> AppResult<()>;

    /// Create the librarian of a library; a library has at most one
    async fn librarians_create(&self, name: &str, library_id: i32) -> AppResult<Librarian>;

    async fn librarians_for_library(&self, library_id: i32) -> AppResult<Option<Librarian>>;
}

#[async_trait]
impl RelationshipStore for PgStore {
    async fn authors_create(&self, name: &str) -> AppResult<Author> {
        let row = sqlx::query_as::<_, Author>(
            "INSERT INTO authors (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn authors_get(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT id, name FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
    }

    async fn books_list(&self) -> AppResult<Vec<LibraryBook>> {
        let query = format!("{} ORDER BY b.id", BOOK_SELECT);
        Ok(sqlx::query_as::<_, LibraryBook>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn books_get(&self, id: i32) -> AppResult<LibraryBook> {
        let query = format!("{} WHERE b.id = $1", BOOK_SELECT);
        sqlx::query_as::<_, LibraryBook>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    async fn books_create(&self, title: &str, author_id: i32) -> AppResult<LibraryBook> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO books (title, author_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(title)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        self.books_get(id).await
    }

    async fn books_update(
        &self,
        id: i32,
        title: Option<&str>,
        author_id: Option<i32>,
    ) -> AppResult<LibraryBook> {
        let updated: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE books
            SET title = COALESCE($1, title), author_id = COALESCE($2, author_id)
            WHERE id = $3
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(author_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.books_get(id).await,
            None => Err(AppError::NotFound(format!("Book {} not found", id))),
        }
    }

    async fn books_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        Ok(())
    }

    async fn books_by_author_name(&self, name: &str) -> AppResult<Vec<LibraryBook>> {
        let query = format!("{} WHERE a.name = $1 ORDER BY b.id", BOOK_SELECT);
        Ok(sqlx::query_as::<_, LibraryBook>(&query)
            .bind(name)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn libraries_create(&self, name: &str) -> AppResult<Library> {
        let row = sqlx::query_as::<_, Library>(
            "INSERT INTO libraries (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn libraries_get(&self, id: i32) -> AppResult<Library> {
        sqlx::query_as::<_, Library>("SELECT id, name FROM libraries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Library {} not found", id)))
    }

    async fn libraries_find_by_name(&self, name: &str) -> AppResult<Option<Library>> {
        Ok(sqlx::query_as::<_, Library>(
            "SELECT id, name FROM libraries WHERE name = $1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn libraries_books(&self, library_id: i32) -> AppResult<Vec<LibraryBook>> {
        let query = format!(
            "{} JOIN library_books lb ON lb.book_id = b.id WHERE lb.library_id = $1 ORDER BY b.id",
            BOOK_SELECT
        );
        Ok(sqlx::query_as::<_, LibraryBook>(&query)
            .bind(library_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn libraries_add_book(&self, library_id: i32, book_id: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO library_books (library_id, book_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(library_id)
        .bind(book_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn librarians_create(&self, name: &str, library_id: i32) -> AppResult<Librarian> {
        if self.librarians_for_library(library_id).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Library {} already has a librarian",
                library_id
            )));
        }
        let row = sqlx::query_as::<_, Librarian>(
            r#"
            INSERT INTO librarians (name, library_id)
            VALUES ($1, $2)
            RETURNING id, name, library_id
            "#,
        )
        .bind(name)
        .bind(library_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn librarians_for_library(&self, library_id: i32) -> AppResult<Option<Librarian>> {
        Ok(sqlx::query_as::<_, Librarian>(
            "SELECT id, name, library_id FROM librarians WHERE library_id = $1",
        )
        .bind(library_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
