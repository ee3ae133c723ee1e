//! Credential gate: authentication and authorization
//!
//! The gate is a per-request linear state machine: extract token, verify
//! signature, check expiry, read subject, resolve the principal, and
//! (on privileged routes) enforce a role. Every step fails closed, and
//! the authorization gate is the authentication gate plus a role check,
//! not a second copy of the logic.

use std::sync::Arc;

use crate::database::Database;
use crate::error::AuthError;
use crate::models::{Role, User};

use super::token::TokenService;

/// Validates session tokens and resolves them to principals
pub struct CredentialGate<D: Database> {
    tokens: TokenService,
    db: Arc<D>,
}

impl<D: Database> CredentialGate<D> {
    /// Create a new gate over the given principal store
    pub fn new(tokens: TokenService, db: Arc<D>) -> Self {
        Self { tokens, db }
    }

    /// Access the underlying token service (for issuance at login)
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Authenticate a request from its session token
    ///
    /// `token` is `None` when the transport carried no credential. A subject
    /// that resolves to no stored principal is conflated with an invalid
    /// token: both are plain authentication failures, so a caller cannot
    /// distinguish a deleted user from a forged token.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<User, AuthError> {
        let token = token.ok_or(AuthError::MissingCredential)?;
        let claims = self.tokens.verify(token)?;

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidSubject)?;

        let user = self
            .db
            .get_user_by_id(user_id)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Principal lookup failed");
                AuthError::UnknownPrincipal
            })?
            .ok_or(AuthError::UnknownPrincipal)?;

        Ok(user)
    }

    /// Authenticate and require a specific role
    ///
    /// Composes `authenticate` with a role comparison; a known principal
    /// with the wrong role is Forbidden, not Unauthenticated.
    pub async fn authenticate_with_role(
        &self,
        token: Option<&str>,
        required: Role,
    ) -> Result<User, AuthError> {
        let user = self.authenticate(token).await?;

        if user.role != required {
            return Err(AuthError::Forbidden);
        }

        Ok(user)
    }
}
