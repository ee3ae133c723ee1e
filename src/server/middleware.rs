//! HTTP middleware for bookwarden
//!
//! This module provides the middleware layers composed around every
//! protected request, in fixed order:
//! - Request/response logging
//! - Per-client admission control (token-bucket rate limiting)
//! - The credential gate (authentication, and role authorization for
//!   admin routes)

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::admission::{AdmissionController, Decision};
use crate::auth::{CredentialGate, AUTH_COOKIE};
use crate::database::Database;
use crate::error::AuthError;
use crate::models::{Role, User};

/// Authenticated principal bound to the request's processing context
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub User);

/// Admission control middleware
///
/// Runs before everything else on the request path. The client identity is
/// the peer IP as seen by the server; a denial short-circuits the request
/// with 429 and a retry hint derived from configuration, never from live
/// bucket state.
pub async fn admission_middleware(
    State(limiter): State<Arc<AdmissionController>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, GateResponse> {
    let identity = addr.ip().to_string();

    match limiter.check(&identity) {
        Decision::Allowed => Ok(next.run(request).await),
        Decision::Denied { retry_after } => {
            tracing::debug!(client = %identity, "Request rejected by admission control");
            Err(GateResponse::rate_limited(retry_after.as_secs().max(1)))
        }
    }
}

/// Authentication middleware for protected routes
///
/// Extracts the session cookie, runs the credential gate, and binds the
/// resolved principal to the request extensions for downstream handlers.
pub async fn require_auth<D: Database + 'static>(
    State(gate): State<Arc<CredentialGate<D>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GateResponse> {
    let token = session_token(request.headers());

    let user = gate
        .authenticate(token.as_deref())
        .await
        .map_err(GateResponse::from_error)?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Authorization middleware for admin routes
///
/// The same gate as `require_auth` plus the admin role requirement; a
/// known principal lacking the role gets 403 rather than 401.
pub async fn require_admin<D: Database + 'static>(
    State(gate): State<Arc<CredentialGate<D>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GateResponse> {
    let token = session_token(request.headers());

    let user = gate
        .authenticate_with_role(token.as_deref(), Role::Admin)
        .await
        .map_err(GateResponse::from_error)?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Read the session token from the designated cookie
///
/// A missing header, missing cookie, or unparseable value are all the same
/// "no credential" case.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", AUTH_COOKIE);
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .map(|s| s.trim())
        .find_map(|s| s.strip_prefix(prefix.as_str()))
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Terminal middleware response for admission and gate failures
pub struct GateResponse {
    status: StatusCode,
    message: String,
    retry_after_secs: Option<u64>,
}

impl GateResponse {
    /// Map a gate error to its external status
    ///
    /// Every authentication sub-case collapses into the same 401 body so
    /// the response leaks nothing about which check failed; the internal
    /// cause is only logged.
    pub fn from_error(error: AuthError) -> Self {
        tracing::debug!(cause = %error, "Credential gate rejected request");

        if error.is_unauthenticated() {
            Self {
                status: StatusCode::UNAUTHORIZED,
                message: "unauthorized".to_string(),
                retry_after_secs: None,
            }
        } else {
            Self {
                status: StatusCode::FORBIDDEN,
                message: "forbidden".to_string(),
                retry_after_secs: None,
            }
        }
    }

    fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "too many requests".to_string(),
            retry_after_secs: Some(retry_after_secs),
        }
    }
}

impl IntoResponse for GateResponse {
    fn into_response(self) -> Response {
        let body = match self.retry_after_secs {
            Some(secs) => serde_json::json!({
                "error": self.message,
                "retry_after_secs": secs,
            }),
            None => serde_json::json!({ "error": self.message }),
        };

        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response();

        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Logging middleware
///
/// Logs method, path, status, and duration for every request.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = %status.as_u16(),
        duration_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}
