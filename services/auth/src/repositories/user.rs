//! User repository for database operations

use chrono::{DateTime, Utc};
use common::database::contains_pattern;
use sqlx::PgPool;
use tracing::info;

use crate::models::{NewUser, UpdateUser, User};

const COLUMNS: &str = "id, username, email, first_name, last_name, bio, role, \
    confirmation_code_hash, confirmation_code_expires_at, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, new_user: &NewUser) -> sqlx::Result<User> {
        info!("Creating new user: {}", new_user.username);

        let sql = format!(
            "INSERT INTO users (username, email, first_name, last_name, bio, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.first_name)
            .bind(&new_user.last_name)
            .bind(&new_user.bio)
            .bind(new_user.role)
            .fetch_one(&self.pool)
            .await
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// List users ordered by username, optionally filtered by a username substring
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<User>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE ($1::TEXT IS NULL OR username ILIKE $1) \
             ORDER BY username LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(search.map(contains_pattern))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    /// Count users matching the same filter as [`UserRepository::list`]
    pub async fn count(&self, search: Option<&str>) -> sqlx::Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM users \
             WHERE ($1::TEXT IS NULL OR username ILIKE $1)",
        )
        .bind(search.map(contains_pattern))
        .fetch_one(&self.pool)
        .await
    }

    /// Apply a partial update; `None` fields keep their value
    pub async fn update(&self, id: i64, changes: &UpdateUser) -> sqlx::Result<Option<User>> {
        info!("Updating user {}", id);

        let sql = format!(
            "UPDATE users SET \
                username = COALESCE($2, username), \
                email = COALESCE($3, email), \
                first_name = COALESCE($4, first_name), \
                last_name = COALESCE($5, last_name), \
                bio = COALESCE($6, bio), \
                role = COALESCE($7, role), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&changes.username)
            .bind(&changes.email)
            .bind(&changes.first_name)
            .bind(&changes.last_name)
            .bind(&changes.bio)
            .bind(changes.role)
            .fetch_optional(&self.pool)
            .await
    }

    /// Delete a user by username; returns whether a row was removed
    pub async fn delete_by_username(&self, username: &str) -> sqlx::Result<bool> {
        info!("Deleting user {}", username);

        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Store the hash and expiry of a newly issued confirmation code
    pub async fn set_confirmation_code(
        &self,
        id: i64,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET confirmation_code_hash = $2, confirmation_code_expires_at = $3, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(code_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Clear a confirmation code, but only if it is still the stored one.
    ///
    /// Returns `false` when a concurrent exchange already consumed it.
    pub async fn consume_confirmation_code(&self, id: i64, code_hash: &str) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET confirmation_code_hash = NULL, confirmation_code_expires_at = NULL, \
             updated_at = NOW() WHERE id = $1 AND confirmation_code_hash = $2",
        )
        .bind(id)
        .bind(code_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
