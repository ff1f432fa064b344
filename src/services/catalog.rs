//! Catalog service behind the REST book endpoints

use validator::Validate;

use crate::{
    error::AppResult,
    models::catalog::{Book, BookPatch, BookPayload, BookQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.catalog.list(query).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Book> {
        self.repository.catalog.get(id).await
    }

    /// Validate and store a new book
    pub async fn create(&self, payload: BookPayload) -> AppResult<Book> {
        payload.validate()?;
        let book = self.repository.catalog.create(&payload).await?;
        tracing::info!(book_id = book.id, "Created book {}", book);
        Ok(book)
    }

    /// Full update; both fields must be valid
    pub async fn update(&self, id: i32, payload: BookPayload) -> AppResult<Book> {
        payload.validate()?;
        self.repository.catalog.update(id, &payload).await
    }

    /// Partial update; absent fields keep their stored value
    pub async fn partial_update(&self, id: i32, patch: BookPatch) -> AppResult<Book> {
        let current = self.repository.catalog.get(id).await?;
        let payload = patch.merge_into(&current)?;
        payload.validate()?;
        self.repository.catalog.update(id, &payload).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.catalog.delete(id).await?;
        tracing::info!(book_id = id, "Deleted book");
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        self.repository.catalog.count().await
    }
}
