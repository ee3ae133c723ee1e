//! Database layer for bookwarden
//!
//! This module defines the database trait and SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{Book, CreateBookRequest, UpdateBookRequest, User};

/// Database trait for data persistence
///
/// This trait defines all database operations needed by the application.
/// It uses `async_trait` for async methods and `mockall::automock` for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Insert a new user, returning the stored record with its assigned ID
    async fn create_user(&self, user: &User) -> Result<User, DbError>;

    /// Look up a user by ID
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError>;

    /// Look up a user by email
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// List all users
    async fn list_users(&self) -> Result<Vec<User>, DbError>;

    // =========================================================================
    // Book operations
    // =========================================================================

    /// Insert a new book, returning the stored record with its assigned ID
    async fn create_book(&self, book: &CreateBookRequest) -> Result<Book, DbError>;

    /// Get a book by ID
    async fn get_book(&self, id: i64) -> Result<Option<Book>, DbError>;

    /// Partially update a book; `DbError::NotFound` if it does not exist
    async fn update_book(&self, id: i64, update: &UpdateBookRequest) -> Result<Book, DbError>;

    /// Delete a book; `DbError::NotFound` if it does not exist
    async fn delete_book(&self, id: i64) -> Result<(), DbError>;

    /// List all books
    async fn list_books(&self) -> Result<Vec<Book>, DbError>;
}
