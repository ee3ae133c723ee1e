//! Book domain model

use serde::{Deserialize, Serialize};

/// A book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Unique book ID
    pub id: i64,

    /// Title
    pub title: String,

    /// Author
    pub author: String,

    /// Category
    pub category: String,
}

/// Request body for creating a book
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub category: String,
}

/// Request body for partially updating a book
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
}

impl Book {
    /// Apply a partial update, leaving unset fields untouched
    pub fn apply(&mut self, update: &UpdateBookRequest) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(author) = &update.author {
            self.author = author.clone();
        }
        if let Some(category) = &update.category {
            self.category = category.clone();
        }
    }
}
