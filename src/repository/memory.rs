//! In-process backend holding every table behind one lock

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CatalogStore, RelationshipStore, StoreHealth, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        catalog::{Book, BookPayload, BookQuery},
        library::{Author, Librarian, Library, LibraryBook},
        user::{AuthToken, NewUser, Permission, Role, User, UserProfile},
    },
};

#[derive(Debug, Clone)]
struct BookRecord {
    title: String,
    author_id: i32,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i32,
    api_books: BTreeMap<i32, Book>,
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, BookRecord>,
    libraries: BTreeMap<i32, Library>,
    library_books: BTreeSet<(i32, i32)>,
    librarians: BTreeMap<i32, Librarian>,
    users: BTreeMap<i32, User>,
    profiles: BTreeMap<i32, Role>,
    permissions: BTreeMap<i32, BTreeSet<Permission>>,
    tokens: BTreeMap<String, AuthToken>,
}

impl Tables {
    /// IDs are shared across tables and never reused
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn joined_book(&self, id: i32) -> Option<LibraryBook> {
        let record = self.books.get(&id)?;
        let author = self.authors.get(&record.author_id)?;
        Some(LibraryBook {
            id,
            title: record.title.clone(),
            author_id: record.author_id,
            author_name: author.name.clone(),
        })
    }

    fn joined_books<I: IntoIterator<Item = i32>>(&self, ids: I) -> Vec<LibraryBook> {
        ids.into_iter().filter_map(|id| self.joined_book(id)).collect()
    }
}

/// Memory backend; clones share the same tables
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let tables = self.tables.read().await;
        let mut books: Vec<Book> = tables
            .api_books
            .values()
            .filter(|book| query.matches(book))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn get(&self, id: i32) -> AppResult<Book> {
        self.tables
            .read()
            .await
            .api_books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    async fn create(&self, book: &BookPayload) -> AppResult<Book> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let book = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
        };
        tables.api_books.insert(id, book.clone());
        Ok(book)
    }

    async fn update(&self, id: i32, book: &BookPayload) -> AppResult<Book> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .api_books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;
        stored.title = book.title.clone();
        stored.author = book.author.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        self.tables
            .write()
            .await
            .api_books
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables.read().await.api_books.len() as i64)
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn authors_create(&self, name: &str) -> AppResult<Author> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let author = Author {
            id,
            name: name.to_string(),
        };
        tables.authors.insert(id, author.clone());
        Ok(author)
    }

    async fn authors_get(&self, id: i32) -> AppResult<Author> {
        self.tables
            .read()
            .await
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
    }

    async fn books_list(&self) -> AppResult<Vec<LibraryBook>> {
        let tables = self.tables.read().await;
        Ok(tables.joined_books(tables.books.keys().copied()))
    }

    async fn books_get(&self, id: i32) -> AppResult<LibraryBook> {
        self.tables
            .read()
            .await
            .joined_book(id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    async fn books_create(&self, title: &str, author_id: i32) -> AppResult<LibraryBook> {
        let mut tables = self.tables.write().await;
        if !tables.authors.contains_key(&author_id) {
            return Err(AppError::BadRequest(format!("Author {} does not exist", author_id)));
        }
        let id = tables.allocate_id();
        tables.books.insert(
            id,
            BookRecord {
                title: title.to_string(),
                author_id,
            },
        );
        tables
            .joined_book(id)
            .ok_or_else(|| AppError::Internal(format!("Book {} vanished after insert", id)))
    }

    async fn books_update(
        &self,
        id: i32,
        title: Option<&str>,
        author_id: Option<i32>,
    ) -> AppResult<LibraryBook> {
        let mut tables = self.tables.write().await;
        if let Some(author_id) = author_id {
            if !tables.authors.contains_key(&author_id) {
                return Err(AppError::BadRequest(format!("Author {} does not exist", author_id)));
            }
        }
        let record = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;
        if let Some(title) = title {
            record.title = title.to_string();
        }
        if let Some(author_id) = author_id {
            record.author_id = author_id;
        }
        tables
            .joined_book(id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    async fn books_delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .books
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;
        tables.library_books.retain(|&(_, book_id)| book_id != id);
        Ok(())
    }

    async fn books_by_author_name(&self, name: &str) -> AppResult<Vec<LibraryBook>> {
        let tables = self.tables.read().await;
        let ids: Vec<i32> = tables
            .books
            .iter()
            .filter(|(_, record)| {
                tables
                    .authors
                    .get(&record.author_id)
                    .is_some_and(|author| author.name == name)
            })
            .map(|(id, _)| *id)
            .collect();
        Ok(tables.joined_books(ids))
    }

    async fn libraries_create(&self, name: &str) -> AppResult<Library> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let library = Library {
            id,
            name: name.to_string(),
        };
        tables.libraries.insert(id, library.clone());
        Ok(library)
    }

    async fn libraries_get(&self, id: i32) -> AppResult<Library> {
        self.tables
            .read()
            .await
            .libraries
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Library {} not found", id)))
    }

    async fn libraries_find_by_name(&self, name: &str) -> AppResult<Option<Library>> {
        Ok(self
            .tables
            .read()
            .await
            .libraries
            .values()
            .find(|library| library.name == name)
            .cloned())
    }

    async fn libraries_books(&self, library_id: i32) -> AppResult<Vec<LibraryBook>> {
        let tables = self.tables.read().await;
        let ids: Vec<i32> = tables
            .library_books
            .iter()
            .filter(|(lib, _)| *lib == library_id)
            .map(|(_, book)| *book)
            .collect();
        Ok(tables.joined_books(ids))
    }

    async fn libraries_add_book(&self, library_id: i32, book_id: i32) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.libraries.contains_key(&library_id) {
            return Err(AppError::NotFound(format!("Library {} not found", library_id)));
        }
        if !tables.books.contains_key(&book_id) {
            return Err(AppError::NotFound(format!("Book {} not found", book_id)));
        }
        tables.library_books.insert((library_id, book_id));
        Ok(())
    }

    async fn librarians_create(&self, name: &str, library_id: i32) -> AppResult<Librarian> {
        let mut tables = self.tables.write().await;
        if !tables.libraries.contains_key(&library_id) {
            return Err(AppError::NotFound(format!("Library {} not found", library_id)));
        }
        if tables.librarians.values().any(|l| l.library_id == library_id) {
            return Err(AppError::Conflict(format!(
                "Library {} already has a librarian",
                library_id
            )));
        }
        let id = tables.allocate_id();
        let librarian = Librarian {
            id,
            name: name.to_string(),
            library_id,
        };
        tables.librarians.insert(id, librarian.clone());
        Ok(librarian)
    }

    async fn librarians_for_library(&self, library_id: i32) -> AppResult<Option<Librarian>> {
        Ok(self
            .tables
            .read()
            .await
            .librarians
            .values()
            .find(|l| l.library_id == library_id)
            .cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        let lowered = user.username.to_lowercase();
        if tables.users.values().any(|u| u.username.to_lowercase() == lowered) {
            return Err(AppError::Conflict("A user with that username already exists".to_string()));
        }
        let id = tables.allocate_id();
        let user = User {
            id,
            username: user.username.clone(),
            password: user.password_hash.clone(),
            email: user.email.clone(),
            is_active: true,
            is_superuser: user.is_superuser,
            date_joined: Utc::now(),
            last_login: None,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let lowered = username.to_lowercase();
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .any(|u| u.username.to_lowercase() == lowered))
    }

    async fn touch_last_login(&self, id: i32) -> AppResult<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn profile(&self, user_id: i32) -> AppResult<Option<UserProfile>> {
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .get(&user_id)
            .map(|role| UserProfile { user_id, role: *role }))
    }

    async fn set_profile(&self, user_id: i32, role: Option<Role>) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }
        match role {
            Some(role) => tables.profiles.insert(user_id, role),
            None => tables.profiles.remove(&user_id),
        };
        Ok(())
    }

    async fn permissions(&self, user_id: i32) -> AppResult<BTreeSet<Permission>> {
        Ok(self
            .tables
            .read()
            .await
            .permissions
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_permissions(&self, user_id: i32, permissions: &[Permission]) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }
        tables
            .permissions
            .insert(user_id, permissions.iter().copied().collect());
        Ok(())
    }

    async fn token_get_or_create(&self, user_id: i32, candidate_key: &str) -> AppResult<AuthToken> {
        let mut tables = self.tables.write().await;
        if let Some(token) = tables.tokens.values().find(|t| t.user_id == user_id) {
            return Ok(token.clone());
        }
        let token = AuthToken {
            key: candidate_key.to_string(),
            user_id,
            created: Utc::now(),
        };
        tables.tokens.insert(token.key.clone(), token.clone());
        Ok(token)
    }

    async fn token_user(&self, key: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tokens
            .get(key)
            .and_then(|token| tables.users.get(&token.user_id))
            .cloned())
    }
}
