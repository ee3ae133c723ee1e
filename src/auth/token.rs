//! Session token issuance and verification
//!
//! Session tokens are stateless HS256-signed JWTs carried in a cookie.
//! A single symmetric key signs and verifies; the algorithm is fixed and
//! tokens declaring any other algorithm are rejected outright, even when
//! otherwise well-formed.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AuthError;

/// Name of the cookie carrying the session token
pub const AUTH_COOKIE: &str = "Authorization";

/// Claims carried by a session token
///
/// Strongly typed: a token missing any field, or carrying a mistyped one,
/// fails verification rather than defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal identifier (user ID)
    pub sub: String,

    /// Issued-at, seconds since the epoch
    pub iat: i64,

    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Issues and verifies session tokens with a single symmetric key
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Create a token service from the configured signing secret
    ///
    /// `clock_skew_secs` is the expiry leeway; the default deployment uses
    /// zero tolerance.
    pub fn new(secret: &str, ttl_hours: u64, clock_skew_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = clock_skew_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::from_secs(ttl_hours * 3600),
        }
    }

    /// Token lifetime, also used for the cookie Max-Age
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject`, expiring after the configured lifetime
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + self.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Issuance(e.to_string()))
    }

    /// Verify a token and return its claims
    ///
    /// Fails closed: any structural, signature, algorithm, or expiry problem
    /// is an error, and the sub-case is only distinguished internally.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidAlgorithm => AuthError::AlgorithmMismatch,
                _ => AuthError::InvalidToken,
            })?;

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidSubject);
        }

        Ok(claims)
    }
}
