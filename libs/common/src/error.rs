//! Custom error types for the common library
//!
//! This module defines the database error type shared by the services and a
//! classifier for PostgreSQL constraint violations, so that every service maps
//! duplicate keys and dangling references the same way.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// PostgreSQL integrity constraint that rejected a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// SQLSTATE 23505
    Unique(String),
    /// SQLSTATE 23503
    ForeignKey(String),
    /// SQLSTATE 23514
    Check(String),
}

impl ConstraintViolation {
    /// Name of the violated constraint (`"unknown"` when the server did not report one)
    pub fn constraint(&self) -> &str {
        match self {
            ConstraintViolation::Unique(name)
            | ConstraintViolation::ForeignKey(name)
            | ConstraintViolation::Check(name) => name,
        }
    }
}

/// Classify a sqlx error as an integrity constraint violation, if it is one
pub fn constraint_violation(err: &SqlxError) -> Option<ConstraintViolation> {
    let SqlxError::Database(db_err) = err else {
        return None;
    };

    let constraint = db_err.constraint().unwrap_or("unknown").to_string();
    match db_err.code().as_deref() {
        Some("23505") => Some(ConstraintViolation::Unique(constraint)),
        Some("23503") => Some(ConstraintViolation::ForeignKey(constraint)),
        Some("23514") => Some(ConstraintViolation::Check(constraint)),
        _ => None,
    }
}

/// Whether the server refused a value itself (SQLSTATE class 22), such as a
/// string too long for its column or a numeric overflow
pub fn is_data_exception(err: &SqlxError) -> bool {
    let SqlxError::Database(db_err) = err else {
        return false;
    };
    db_err.code().is_some_and(|code| code.starts_with("22"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_violations() {
        assert_eq!(constraint_violation(&SqlxError::RowNotFound), None);
        assert_eq!(constraint_violation(&SqlxError::PoolTimedOut), None);
        assert!(!is_data_exception(&SqlxError::PoolTimedOut));
    }

    #[test]
    fn test_constraint_name_accessor() {
        let violation = ConstraintViolation::Unique("uq_users_email".to_string());
        assert_eq!(violation.constraint(), "uq_users_email");
    }

    #[test]
    fn test_error_display() {
        let err = DatabaseError::Migration("checksum mismatch".to_string());
        assert_eq!(err.to_string(), "Database migration error: checksum mismatch");
    }
}
