//! Where imported rows are written

use async_trait::async_trait;
use common::error::{constraint_violation, is_data_exception};
use sqlx::PgPool;
use thiserror::Error;

use super::files::Table;
use super::record::Row;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The row violates a table constraint or holds a value the column
    /// cannot store; other rows can still be written
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(violation) = constraint_violation(&err) {
            return StoreError::Rejected(format!(
                "violates constraint {}",
                violation.constraint()
            ));
        }
        if is_data_exception(&err) {
            return StoreError::Rejected(err.to_string());
        }
        StoreError::Database(err)
    }
}

/// Destination of an import run
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Whether a row with `id` exists in `table`
    async fn exists(&self, table: Table, id: i64) -> Result<bool, StoreError>;

    /// Insert a row under its own id
    async fn insert(&self, row: &Row) -> Result<(), StoreError>;

    /// Move the id sequence of `table` past the largest stored id
    async fn sync_sequence(&self, table: Table) -> Result<(), StoreError>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgImportStore {
    pool: PgPool,
}

impl PgImportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportStore for PgImportStore {
    async fn exists(&self, table: Table, id: i64) -> Result<bool, StoreError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", table.name());
        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, row: &Row) -> Result<(), StoreError> {
        match row {
            Row::User(user) => {
                sqlx::query(
                    r#"
                    INSERT INTO users (id, username, email, role, bio, first_name, last_name)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(user.id)
                .bind(&user.username)
                .bind(&user.email)
                .bind(user.role)
                .bind(&user.bio)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .execute(&self.pool)
                .await?;
            }
            Row::Category(label) | Row::Genre(label) => {
                let table = if matches!(row, Row::Category(_)) {
                    Table::Categories
                } else {
                    Table::Genres
                };
                let sql = format!(
                    "INSERT INTO {} (id, name, slug) VALUES ($1, $2, $3)",
                    table.name()
                );
                sqlx::query(&sql)
                    .bind(label.id)
                    .bind(&label.name)
                    .bind(&label.slug)
                    .execute(&self.pool)
                    .await?;
            }
            Row::Title(title) => {
                sqlx::query(
                    r#"
                    INSERT INTO titles (id, name, year, description, category_id)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(title.id)
                .bind(&title.name)
                .bind(title.year)
                .bind(&title.description)
                .bind(title.category)
                .execute(&self.pool)
                .await?;
            }
            Row::GenreTitle(link) => {
                sqlx::query("INSERT INTO title_genres (id, title_id, genre_id) VALUES ($1, $2, $3)")
                    .bind(link.id)
                    .bind(link.title)
                    .bind(link.genre)
                    .execute(&self.pool)
                    .await?;
            }
            Row::Review(review) => {
                sqlx::query(
                    r#"
                    INSERT INTO reviews (id, title_id, author_id, text, score, pub_date)
                    VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW()))
                    "#,
                )
                .bind(review.id)
                .bind(review.title)
                .bind(review.author)
                .bind(&review.text)
                .bind(review.score)
                .bind(review.pub_date)
                .execute(&self.pool)
                .await?;
            }
            Row::Comment(comment) => {
                sqlx::query(
                    r#"
                    INSERT INTO comments (id, review_id, author_id, text, pub_date)
                    VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))
                    "#,
                )
                .bind(comment.id)
                .bind(comment.review)
                .bind(comment.author)
                .bind(&comment.text)
                .bind(comment.pub_date)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn sync_sequence(&self, table: Table) -> Result<(), StoreError> {
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
             COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)",
            table = table.name()
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_constraint_errors_stay_fatal() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
