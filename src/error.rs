//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Postgres SQLSTATE for a foreign key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Postgres SQLSTATE for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Invalid or missing API keys
/// - **Resource Errors**: Requested record not found (or soft-deleted)
/// - **Business Rule Errors**: Operations the current state does not allow
/// - **Concurrency Errors**: The record changed since the client read it
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// API key is missing, invalid, or inactive.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    Unauthorized,

    /// Requested record does not exist.
    ///
    /// Returns HTTP 404 Not Found. The string names the entity.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request is well formed but the current state forbids it
    /// (e.g. deleting a category that still has transactions).
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Concurrency token mismatch or duplicate unique value.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A restricted fund would be overdrawn, or stock would go negative.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
}

impl AppError {
    /// Shorthand for a version mismatch on `entity`.
    pub fn stale(entity: &str) -> Self {
        AppError::Conflict(format!(
            "{entity} was modified by another user; reload and try again"
        ))
    }

    /// HTTP status and stable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid_api_key"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::InvalidOperation(_) => (StatusCode::BAD_REQUEST, "invalid_operation"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::InsufficientBalance(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_balance")
            }
            AppError::Database(err) => match database_code(err).as_deref() {
                Some(FOREIGN_KEY_VIOLATION) => (StatusCode::BAD_REQUEST, "invalid_reference"),
                Some(UNIQUE_VIOLATION) => (StatusCode::CONFLICT, "duplicate"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
        }
    }
}

fn database_code(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Database errors that are not constraint violations are logged and
/// reported as a generic 500 without details.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Database(err) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %err, "database error while handling request");
                "An internal error occurred".to_string()
            }
            AppError::Database(err) => {
                tracing::warn!(error = %err, code, "constraint violation");
                match code {
                    "invalid_reference" => "A referenced record does not exist".to_string(),
                    _ => "A record with the same unique value already exists".to_string(),
                }
            }
            AppError::InvalidRequest(msg)
            | AppError::InvalidOperation(msg)
            | AppError::Conflict(msg)
            | AppError::InsufficientBalance(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_expected_statuses() {
        let cases = [
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::NotFound("Fund"), StatusCode::NOT_FOUND),
            (
                AppError::InvalidRequest("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::InvalidOperation("nope".into()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::stale("Fund"), StatusCode::CONFLICT),
            (
                AppError::InsufficientBalance("low".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_and_code().0, expected, "{err}");
        }
    }

    #[test]
    fn plain_database_errors_are_internal() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(
            err.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        );
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(AppError::NotFound("Grant").to_string(), "Grant not found");
    }
}
