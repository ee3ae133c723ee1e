//! SQLite implementation of the Database trait
//!
//! This module provides a SQLite-based implementation of the Database trait
//! using rusqlite and tokio-rusqlite for async operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::migrations::CREATE_SCHEMA;
use super::Database;
use crate::error::DbError;
use crate::models::{Book, CreateBookRequest, Role, UpdateBookRequest, User};

/// SQLite database implementation
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Create a new SQLite database connection
    ///
    /// Use `:memory:` for an in-memory database or a file path for
    /// persistent storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        // Run migrations
        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User, rusqlite::Error> {
    let role_str: String = row.get("role")?;
    let role = Role::parse(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown role: {}", role_str).into(),
        )
    })?;

    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        role,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn parse_timestamp(row: &rusqlite::Row<'_>, column: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("bad timestamp: {}", e).into(),
            )
        })
}

fn row_to_book(row: &rusqlite::Row<'_>) -> Result<Book, rusqlite::Error> {
    Ok(Book {
        id: row.get("id")?,
        title: row.get("title")?,
        author: row.get("author")?,
        category: row.get("category")?,
    })
}

#[async_trait]
impl Database for SqliteDatabase {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: &User) -> Result<User, DbError> {
        let mut user = user.clone();

        let stored = self
            .conn
            .call(move |conn| {
                let inserted = conn.execute(
                    r#"
                    INSERT INTO users (email, password_hash, role, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    rusqlite::params![
                        user.email,
                        user.password_hash,
                        user.role.as_str(),
                        user.created_at.to_rfc3339(),
                        user.updated_at.to_rfc3339(),
                    ],
                );

                match inserted {
                    Ok(_) => {
                        user.id = conn.last_insert_rowid();
                        Ok(user)
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(map_constraint)?;

        Ok(stored)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let user = self
            .conn
            .call(move |conn| {
                let user = conn
                    .query_row("SELECT * FROM users WHERE id = ?1", [id], row_to_user)
                    .optional()?;
                Ok(user)
            })
            .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = email.to_string();

        let user = self
            .conn
            .call(move |conn| {
                let user = conn
                    .query_row("SELECT * FROM users WHERE email = ?1", [email], row_to_user)
                    .optional()?;
                Ok(user)
            })
            .await?;

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, DbError> {
        let users = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT * FROM users ORDER BY id")?;
                let users = stmt
                    .query_map([], row_to_user)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(users)
            })
            .await?;

        Ok(users)
    }

    // =========================================================================
    // Book operations
    // =========================================================================

    async fn create_book(&self, book: &CreateBookRequest) -> Result<Book, DbError> {
        let book = book.clone();

        let stored = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO books (title, author, category) VALUES (?1, ?2, ?3)",
                    rusqlite::params![book.title, book.author, book.category],
                )?;
                Ok(Book {
                    id: conn.last_insert_rowid(),
                    title: book.title,
                    author: book.author,
                    category: book.category,
                })
            })
            .await?;

        Ok(stored)
    }

    async fn get_book(&self, id: i64) -> Result<Option<Book>, DbError> {
        let book = self
            .conn
            .call(move |conn| {
                let book = conn
                    .query_row("SELECT * FROM books WHERE id = ?1", [id], row_to_book)
                    .optional()?;
                Ok(book)
            })
            .await?;

        Ok(book)
    }

    async fn update_book(&self, id: i64, update: &UpdateBookRequest) -> Result<Book, DbError> {
        let update = update.clone();

        let updated = self
            .conn
            .call(move |conn| {
                let book = conn
                    .query_row("SELECT * FROM books WHERE id = ?1", [id], row_to_book)
                    .optional()?;

                let mut book = match book {
                    Some(book) => book,
                    None => return Ok(None),
                };
                book.apply(&update);

                conn.execute(
                    "UPDATE books SET title = ?1, author = ?2, category = ?3 WHERE id = ?4",
                    rusqlite::params![book.title, book.author, book.category, id],
                )?;
                Ok(Some(book))
            })
            .await?;

        updated.ok_or(DbError::NotFound)
    }

    async fn delete_book(&self, id: i64) -> Result<(), DbError> {
        let deleted = self
            .conn
            .call(move |conn| {
                let rows = conn.execute("DELETE FROM books WHERE id = ?1", [id])?;
                Ok(rows)
            })
            .await?;

        if deleted == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn list_books(&self) -> Result<Vec<Book>, DbError> {
        let books = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT * FROM books ORDER BY id")?;
                let books = stmt
                    .query_map([], row_to_book)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(books)
            })
            .await?;

        Ok(books)
    }
}

/// Translate SQLite unique-constraint failures into `DbError::ConstraintViolation`
fn map_constraint(err: tokio_rusqlite::Error) -> DbError {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, ref msg)) = err {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            return DbError::ConstraintViolation(
                msg.clone().unwrap_or_else(|| "unique constraint".to_string()),
            );
        }
    }
    DbError::Sqlite(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    async fn test_db() -> SqliteDatabase {
        SqliteDatabase::in_memory().await.unwrap()
    }

    // Test 1: Create and fetch a user by ID
    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = test_db().await;
        let user = db
            .create_user(&User::new("alice@example.com", "hash", Role::User))
            .await
            .unwrap();
        assert!(user.id > 0);

        let fetched = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "alice@example.com");
        assert_eq!(fetched.role, Role::User);
    }

    // Test 2: Fetch a user by email
    #[tokio::test]
    async fn test_get_user_by_email() {
        let db = test_db().await;
        db.create_user(&User::new("bob@example.com", "hash", Role::Admin))
            .await
            .unwrap();

        let fetched = db.get_user_by_email("bob@example.com").await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().role, Role::Admin);

        let missing = db.get_user_by_email("nobody@example.com").await.unwrap();
        assert!(missing.is_none());
    }

    // Test 3: Duplicate email violates the unique constraint
    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = test_db().await;
        db.create_user(&User::new("dup@example.com", "hash1", Role::User))
            .await
            .unwrap();

        let result = db
            .create_user(&User::new("dup@example.com", "hash2", Role::User))
            .await;
        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));
    }

    // Test 4: List users returns all records in insertion order
    #[tokio::test]
    async fn test_list_users() {
        let db = test_db().await;
        db.create_user(&User::new("u1@example.com", "h", Role::User))
            .await
            .unwrap();
        db.create_user(&User::new("u2@example.com", "h", Role::Admin))
            .await
            .unwrap();

        let users = db.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].email, "u1@example.com");
        assert_eq!(users[1].email, "u2@example.com");
    }

    // Test 5: Book CRUD round trip
    #[tokio::test]
    async fn test_book_crud() {
        let db = test_db().await;
        let book = db
            .create_book(&CreateBookRequest {
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                category: "sci-fi".to_string(),
            })
            .await
            .unwrap();
        assert!(book.id > 0);

        let fetched = db.get_book(book.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Dune");

        let updated = db
            .update_book(
                book.id,
                &UpdateBookRequest {
                    category: Some("classic".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.category, "classic");
        assert_eq!(updated.title, "Dune");

        db.delete_book(book.id).await.unwrap();
        assert!(db.get_book(book.id).await.unwrap().is_none());
    }

    // Test 6: Updating a missing book returns NotFound
    #[tokio::test]
    async fn test_update_missing_book() {
        let db = test_db().await;
        let result = db.update_book(42, &UpdateBookRequest::default()).await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    // Test 7: Deleting a missing book returns NotFound
    #[tokio::test]
    async fn test_delete_missing_book() {
        let db = test_db().await;
        let result = db.delete_book(42).await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    // Test 8: List books
    #[tokio::test]
    async fn test_list_books() {
        let db = test_db().await;
        for title in ["A", "B", "C"] {
            db.create_book(&CreateBookRequest {
                title: title.to_string(),
                author: "X".to_string(),
                category: "misc".to_string(),
            })
            .await
            .unwrap();
        }

        let books = db.list_books().await.unwrap();
        assert_eq!(books.len(), 3);
    }
}
