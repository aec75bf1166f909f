//! Custom error types for the API service

use auth::{AuthError, validation::FieldErrors};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{ConstraintViolation, constraint_violation};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated, but the role does not allow the operation
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found
    #[error("Not found")]
    NotFound,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Field-level validation failure
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    /// Error raised by the authentication layer
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                message("Authentication credentials were not provided or are invalid"),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                message("You do not have permission to perform this action"),
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, message("Not found")),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, message(&msg)),
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
            ApiError::Auth(err) => return err.into_response(),
            ApiError::Database(err) => classify_sqlx_error(&err),
        };

        (status, Json(body)).into_response()
    }
}

fn message(msg: &str) -> serde_json::Value {
    json!({ "error": msg })
}

fn internal() -> (StatusCode, serde_json::Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        message("Internal server error"),
    )
}

/// Map a sqlx error to a status and body.
///
/// Constraint names follow `uq_<table>_<column>` / `ck_<table>_<rule>`, so
/// the message can point at the offending value without leaking SQL.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, serde_json::Value) {
    if matches!(err, sqlx::Error::RowNotFound) {
        return (StatusCode::NOT_FOUND, message("Not found"));
    }

    match constraint_violation(err) {
        Some(ConstraintViolation::Unique(constraint)) => (
            StatusCode::BAD_REQUEST,
            message(&format!(
                "Duplicate value violates unique constraint: {}",
                constraint
            )),
        ),
        Some(ConstraintViolation::ForeignKey(constraint)) => (
            StatusCode::BAD_REQUEST,
            message(&format!("Referenced object does not exist: {}", constraint)),
        ),
        Some(ConstraintViolation::Check(constraint)) => (
            StatusCode::BAD_REQUEST,
            message(&format!("Value violates check constraint: {}", constraint)),
        ),
        None => {
            error!("Database error: {}", err);
            internal()
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn to_response(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(to_response(ApiError::Unauthorized).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(to_response(ApiError::Forbidden).await.0, StatusCode::FORBIDDEN);
        assert_eq!(to_response(ApiError::NotFound).await.0, StatusCode::NOT_FOUND);
        assert_eq!(
            to_response(ApiError::Auth(AuthError::TooManyAttempts)).await.0,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            to_response(ApiError::Database(sqlx::Error::RowNotFound)).await.0,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_validation_body_is_keyed_by_field() {
        let (status, body) = to_response(FieldErrors::single("score", "out of range").into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["score"][0], "out of range");
    }

    #[tokio::test]
    async fn test_internal_errors_are_sanitized() {
        let (status, body) = to_response(ApiError::Database(sqlx::Error::PoolTimedOut)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_auth_errors_keep_their_shape() {
        let (status, body) = to_response(AuthError::InvalidConfirmationCode.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["confirmation_code"], "Wrong confirmation_code");
    }
}
