//! HTTP router for bookwarden
//!
//! This module defines the axum router and its handlers:
//! - Health check
//! - Signup, login, validate, logout
//! - Books CRUD (authenticated)
//! - Admin listings (admin role required)

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::admission::AdmissionController;
use crate::auth::{hash_password, verify_password, CredentialGate, AUTH_COOKIE};
use crate::database::Database;
use crate::error::DbError;
use crate::models::{CreateBookRequest, Credentials, Role, UpdateBookRequest, User};

use super::middleware::{
    admission_middleware, logging_middleware, require_admin, require_auth, AuthenticatedUser,
};

/// Shared application state
pub struct AppState<D: Database> {
    /// Credential gate
    pub gate: Arc<CredentialGate<D>>,

    /// User and book store
    pub database: Arc<D>,

    /// Per-client admission controller
    pub limiter: Arc<AdmissionController>,
}

impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            gate: Arc::clone(&self.gate),
            database: Arc::clone(&self.database),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Build the main application router
///
/// Middleware order is fixed: logging wraps admission control, which wraps
/// the per-group credential gates.
pub fn build_router<D: Database + 'static>(state: AppState<D>) -> Router {
    let protected = Router::new()
        .route("/auth/validate", get(validate_handler))
        .route("/auth/logout", get(logout_handler))
        .route("/api/books", post(create_book_handler::<D>))
        .route(
            "/api/books/:id",
            get(get_book_handler::<D>)
                .patch(update_book_handler::<D>)
                .delete(delete_book_handler::<D>),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.gate),
            require_auth::<D>,
        ));

    let admin = Router::new()
        .route("/admin/users", get(admin_list_users_handler::<D>))
        .route("/admin/books", get(admin_list_books_handler::<D>))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.gate),
            require_admin::<D>,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/signup", post(signup_handler::<D>))
        .route("/auth/login", post(login_handler::<D>))
        .merge(protected)
        .merge(admin)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.limiter),
            admission_middleware,
        ))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

// =============================================================================
// Handler error type
// =============================================================================

/// Error response for route handlers
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => ApiError::not_found("record not found"),
            DbError::ConstraintViolation(_) => ApiError::bad_request("conflicting record"),
            DbError::Sqlite(e) => {
                tracing::error!(error = %e, "Database operation failed");
                ApiError::internal("internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

// =============================================================================
// Health handler
// =============================================================================

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Auth handlers
// =============================================================================

async fn signup_handler<D: Database>(
    State(state): State<AppState<D>>,
    Json(body): Json<Credentials>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }

    if state
        .database
        .get_user_by_email(&body.email)
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("user already exists"));
    }

    let password_hash =
        hash_password(&body.password).map_err(|e| ApiError::internal(e.to_string()))?;

    let user = state
        .database
        .create_user(&User::new(&body.email, password_hash, Role::User))
        .await?;

    tracing::info!(user_id = user.id, "User created");

    Ok(Json(serde_json::json!({
        "message": "user created successfully",
        "user": user,
    })))
}

async fn login_handler<D: Database>(
    State(state): State<AppState<D>>,
    Json(body): Json<Credentials>,
) -> Result<Response, ApiError> {
    // One message for both unknown email and wrong password
    let invalid = || ApiError::bad_request("invalid email or password");

    let user = state
        .database
        .get_user_by_email(&body.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&body.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = state
        .gate
        .tokens()
        .issue(&user.id.to_string())
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!(user_id = user.id, "User logged in");

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; Max-Age={}",
        AUTH_COOKIE,
        token,
        state.gate.tokens().ttl().as_secs()
    );

    let body = Json(serde_json::json!({
        "message": "logged in successfully",
        "user": user,
        "token": token,
    }));

    Ok(([(header::SET_COOKIE, cookie)], body).into_response())
}

async fn validate_handler(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "authenticated",
        "user": user,
    }))
}

async fn logout_handler() -> Response {
    // Logout only clears the client-side cookie; the token itself stays
    // cryptographically valid until expiry
    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", AUTH_COOKIE);
    let body = Json(serde_json::json!({ "message": "logged out successfully" }));

    ([(header::SET_COOKIE, cookie)], body).into_response()
}

// =============================================================================
// Book handlers
// =============================================================================

async fn create_book_handler<D: Database>(
    State(state): State<AppState<D>>,
    Json(body): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let book = state.database.create_book(&body).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "book": book })),
    ))
}

async fn get_book_handler<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let book = state
        .database
        .get_book(id)
        .await?
        .ok_or_else(|| ApiError::not_found("book not found"))?;
    Ok(Json(serde_json::json!({ "book": book })))
}

async fn update_book_handler<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBookRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let book = state.database.update_book(id, &body).await?;
    Ok(Json(serde_json::json!({ "book": book })))
}

async fn delete_book_handler<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.database.delete_book(id).await?;
    Ok(Json(serde_json::json!({ "message": "book deleted" })))
}

// =============================================================================
// Admin handlers
// =============================================================================

async fn admin_list_users_handler<D: Database>(
    State(state): State<AppState<D>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let users = state.database.list_users().await?;
    Ok(Json(serde_json::json!({ "users": users })))
}

async fn admin_list_books_handler<D: Database>(
    State(state): State<AppState<D>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let books = state.database.list_books().await?;
    Ok(Json(serde_json::json!({ "books": books })))
}
