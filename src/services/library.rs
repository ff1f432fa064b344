//! Relationship app: authors, library shelves and librarians

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::library::{
        Author, CreateLibraryBook, Librarian, Library, LibraryBook, LibraryDetail, NameRequest,
        UpdateLibraryBook,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LibraryService {
    repository: Repository,
}

impl LibraryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self) -> AppResult<Vec<LibraryBook>> {
        self.repository.relationship.books_list().await
    }

    /// Library with its books
    pub async fn library_detail(&self, id: i32) -> AppResult<LibraryDetail> {
        let library = self.repository.relationship.libraries_get(id).await?;
        let books = self.repository.relationship.libraries_books(id).await?;
        Ok(LibraryDetail {
            id: library.id,
            name: library.name,
            books,
        })
    }

    /// Books by the named author; an unknown author yields no books
    pub async fn books_by_author(&self, author_name: &str) -> AppResult<Vec<LibraryBook>> {
        self.repository
            .relationship
            .books_by_author_name(author_name)
            .await
    }

    /// Books on the named library's shelves; an unknown library yields no books
    pub async fn books_in_library(&self, library_name: &str) -> AppResult<Vec<LibraryBook>> {
        match self
            .repository
            .relationship
            .libraries_find_by_name(library_name)
            .await?
        {
            Some(library) => self.repository.relationship.libraries_books(library.id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Librarian of the named library, if both exist
    pub async fn librarian_for_library(&self, library_name: &str) -> AppResult<Option<Librarian>> {
        match self
            .repository
            .relationship
            .libraries_find_by_name(library_name)
            .await?
        {
            Some(library) => {
                self.repository
                    .relationship
                    .librarians_for_library(library.id)
                    .await
            }
            None => Ok(None),
        }
    }

    pub async fn add_book(&self, form: CreateLibraryBook) -> AppResult<LibraryBook> {
        form.validate()?;
        let author_id = form
            .author_id
            .ok_or_else(|| AppError::Validation("Author is required".to_string()))?;
        self.ensure_author(author_id).await?;

        let book = self
            .repository
            .relationship
            .books_create(&form.title, author_id)
            .await?;
        tracing::info!(book_id = book.id, "Book added");
        Ok(book)
    }

    pub async fn edit_book(&self, id: i32, form: UpdateLibraryBook) -> AppResult<LibraryBook> {
        form.validate()?;
        self.repository.relationship.books_get(id).await?;
        if let Some(author_id) = form.author_id {
            self.ensure_author(author_id).await?;
        }

        let book = self
            .repository
            .relationship
            .books_update(id, form.title.as_deref(), form.author_id)
            .await?;
        tracing::info!(book_id = book.id, "Book edited");
        Ok(book)
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.relationship.books_delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    pub async fn create_author(&self, request: NameRequest) -> AppResult<Author> {
        request.validate()?;
        self.repository.relationship.authors_create(&request.name).await
    }

    pub async fn create_library(&self, request: NameRequest) -> AppResult<Library> {
        request.validate()?;
        self.repository.relationship.libraries_create(&request.name).await
    }

    pub async fn shelve_book(&self, library_id: i32, book_id: i32) -> AppResult<LibraryDetail> {
        self.repository.relationship.libraries_get(library_id).await?;
        self.repository.relationship.books_get(book_id).await?;
        self.repository
            .relationship
            .libraries_add_book(library_id, book_id)
            .await?;
        self.library_detail(library_id).await
    }

    pub async fn appoint_librarian(&self, library_id: i32, request: NameRequest) -> AppResult<Librarian> {
        request.validate()?;
        self.repository.relationship.libraries_get(library_id).await?;
        self.repository
            .relationship
            .librarians_create(&request.name, library_id)
            .await
    }

    /// Unknown authors are a form error, not a missing page
    async fn ensure_author(&self, author_id: i32) -> AppResult<()> {
        match self.repository.relationship.authors_get(author_id).await {
            Ok(_) => Ok(()),
            Err(AppError::NotFound(_)) => Err(AppError::Validation(format!(
                "Select a valid author; {} is not one of the available choices",
                author_id
            ))),
            Err(e) => Err(e),
        }
    }
}
