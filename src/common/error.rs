// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::error;

use super::validation::{FieldError, ValidationResult};
use crate::auth::password::PasswordError;
use crate::auth::session::SessionError;
use crate::services::email::EmailError;

/// Uniform message for every sign-in failure
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// API error types
///
/// Every handler returns `Result<_, ApiError>`; nothing escapes to the client
/// except the JSON envelope produced by `IntoResponse`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation Error: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Upstream Error: {0}")]
    Upstream(String),

    #[error("Database Error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal Server Error: {0}")]
    InternalServer(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApiError {
    /// Shorthand for a single-field validation failure
    pub fn invalid_field(field: &str, message: &str) -> Self {
        ApiError::Validation(vec![FieldError {
            field: field.to_string(),
            message: message.to_string(),
        }])
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut details = None;
        let (status, error_message, code) = match self {
            ApiError::Validation(errors) => {
                details = Some(errors);
                (
                    StatusCode::BAD_REQUEST,
                    "Validation failed".to_string(),
                    "VALIDATION_ERROR",
                )
            }
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg, "CONFLICT"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            ApiError::InvalidToken => (
                StatusCode::BAD_REQUEST,
                "Invalid or already used token".to_string(),
                "INVALID_TOKEN",
            ),
            ApiError::ExpiredToken => (
                StatusCode::BAD_REQUEST,
                "Token has expired".to_string(),
                "TOKEN_EXPIRED",
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                INVALID_CREDENTIALS_MESSAGE.to_string(),
                "INVALID_CREDENTIALS",
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            ApiError::Upstream(msg) => {
                error!(error = %msg, "Upstream service failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again later.".to_string(),
                    "UPSTREAM_ERROR",
                )
            }
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                    "DATABASE_ERROR",
                )
            }
            ApiError::InternalServer(msg) => {
                error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR",
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
            details,
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            ApiError::Validation(result.errors)
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(e: EmailError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        ApiError::InternalServer(e.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Invalid(_) => ApiError::Unauthorized("invalid session".to_string()),
            SessionError::Signing(msg) => ApiError::InternalServer(msg),
        }
    }
}

/// Returns true when the database rejected a write because of a UNIQUE constraint
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
