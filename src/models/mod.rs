//! Data models for Bookshelf

pub mod catalog;
pub mod library;
pub mod user;

// Re-export commonly used types
pub use catalog::Book;
pub use library::{Author, Librarian, Library, LibraryBook};
pub use user::{Permission, Role, User, UserProfile};
