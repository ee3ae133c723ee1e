//! bookwarden: a book catalog API behind a per-client admission controller
//! and a stateless credential gate
//!
//! Every request passes a token-bucket admission check keyed by client
//! identity before it reaches routing. Protected routes additionally pass
//! the credential gate, which verifies an HS256-signed session token from
//! a cookie and resolves it to a stored principal. Admin routes require
//! the admin role on top of authentication.

pub mod admission;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod server;

pub use config::Config;
pub use error::AppError;
