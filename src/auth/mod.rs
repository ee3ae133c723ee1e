//! Authentication system for bookwarden
//!
//! This module provides authentication and authorization functionality:
//! - Stateless signed session tokens (issue and verify)
//! - The credential gate: token verification, principal resolution,
//!   and role-based authorization
//! - One-way password hashing

pub mod gate;
pub mod password;
pub mod token;

pub use gate::CredentialGate;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService, AUTH_COOKIE};
