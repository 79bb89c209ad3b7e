// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::store::StoreError;

/// Failures reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately indistinguishable.
    InvalidCredential,
    DuplicateAccount(String),
    WeakCredential(String),
    NotAuthenticated,
    /// The caller asked before the token was resolved.
    IdentityUnresolved,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredential => write!(f, "Invalid email or password"),
            AuthError::DuplicateAccount(email) => {
                write!(f, "An account for '{}' already exists", email)
            }
            AuthError::WeakCredential(reason) => write!(f, "Weak password: {}", reason),
            AuthError::NotAuthenticated => write!(f, "Not signed in"),
            AuthError::IdentityUnresolved => write!(f, "Identity is still being resolved"),
        }
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable: the store rejected or dropped a read/write
    Persistence(String),

    // 400 Bad Request
    Validation(String),

    // 401 Unauthorized / 409 Conflict / 422, depending on the kind
    Auth(AuthError),

    // 403 Forbidden (locked label, non-admin)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg) => write!(f, "internal error: {}", msg),
            AppError::Persistence(msg) => write!(f, "persistence error: {}", msg),
            AppError::Validation(msg) => write!(f, "validation error: {}", msg),
            AppError::Auth(err) => write!(f, "auth error: {}", err),
            AppError::Forbidden(msg) => write!(f, "forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "not found: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Persistence(msg) => {
                tracing::error!("Persistence failure: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Could not reach the data store. Please try again.".to_string(),
                )
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Auth(err) => {
                let status = match err {
                    AuthError::DuplicateAccount(_) => StatusCode::CONFLICT,
                    AuthError::WeakCredential(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    AuthError::IdentityUnresolved => StatusCode::SERVICE_UNAVAILABLE,
                    AuthError::InvalidCredential | AuthError::NotAuthenticated => {
                        StatusCode::UNAUTHORIZED
                    }
                };
                (status, err.to_string())
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

/// Store failures are transport problems unless the path itself was malformed.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidPath(path) => {
                AppError::Validation(format!("Invalid key or path: {}", path))
            }
            other => AppError::Persistence(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
