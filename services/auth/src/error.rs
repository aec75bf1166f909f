//! Error type for the authentication flow

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{ConstraintViolation, constraint_violation};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::validation::FieldErrors;

/// Custom error type for authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Field-level validation failure
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    /// No user with the given username
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Confirmation code is wrong, expired or already used
    #[error("Invalid confirmation code")]
    InvalidConfirmationCode,

    /// Missing, malformed or expired bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Too many code exchange attempts for one username
    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    /// Confirmation code could not be delivered
    #[error("Failed to send confirmation code: {0}")]
    Delivery(String),

    /// Token signing or verification failure
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Type alias for authentication results
pub type AuthResult<T> = Result<T, AuthError>;

impl From<FieldErrors> for AuthError {
    fn from(errors: FieldErrors) -> Self {
        AuthError::Validation(errors)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AuthError::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
            AuthError::UserNotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "username": "This username does not exist!" }),
            ),
            AuthError::InvalidConfirmationCode => (
                StatusCode::BAD_REQUEST,
                json!({ "confirmation_code": "Wrong confirmation_code" }),
            ),
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Authentication credentials were not provided or are invalid" }),
            ),
            AuthError::TooManyAttempts => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "Too many attempts, try again later" }),
            ),
            AuthError::Database(ref err) => match constraint_violation(err) {
                Some(ConstraintViolation::Unique(constraint)) => {
                    let field = duplicate_field(&constraint);
                    let errors = FieldErrors::single(
                        field,
                        format!("A user with that {} already exists.", field),
                    );
                    (StatusCode::BAD_REQUEST, json!(errors))
                }
                _ => {
                    error!("Database error in auth flow: {}", err);
                    internal()
                }
            },
            AuthError::Delivery(ref msg) => {
                error!("Confirmation code delivery failed: {}", msg);
                internal()
            }
            AuthError::Token(ref err) => {
                error!("Token error: {}", err);
                internal()
            }
            AuthError::Internal(ref msg) => {
                error!("Internal auth error: {}", msg);
                internal()
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, serde_json::Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "Internal server error" }),
    )
}

/// Field named by a `uq_users_<field>` constraint
fn duplicate_field(constraint: &str) -> &str {
    constraint.strip_prefix("uq_users_").unwrap_or("value")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                AuthError::Validation(FieldErrors::single("email", "bad")),
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthError::UserNotFound("ghost".into()),
                StatusCode::NOT_FOUND,
            ),
            (AuthError::InvalidConfirmationCode, StatusCode::BAD_REQUEST),
            (AuthError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AuthError::TooManyAttempts, StatusCode::TOO_MANY_REQUESTS),
            (
                AuthError::Database(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_duplicate_field_from_constraint() {
        assert_eq!(duplicate_field("uq_users_email"), "email");
        assert_eq!(duplicate_field("uq_users_username"), "username");
        assert_eq!(duplicate_field("something_else"), "value");
    }
}
