//! Domain models for bookwarden

pub mod book;
pub mod user;

pub use book::{Book, CreateBookRequest, UpdateBookRequest};
pub use user::{Credentials, Role, User};
