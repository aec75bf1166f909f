//! Review repository

use sqlx::PgPool;
use tracing::info;

use crate::models::review::Review;

const REVIEW_COLUMNS: &str =
    "r.id, r.title_id, r.author_id, u.username AS author, r.text, r.score, r.pub_date";

#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reviews of a title, newest first
    pub async fn list_for_title(
        &self,
        title_id: i64,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews r JOIN users u ON u.id = r.author_id \
             WHERE r.title_id = $1 ORDER BY r.pub_date DESC, r.id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Review>(&sql)
            .bind(title_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count_for_title(&self, title_id: i64) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
            .bind(title_id)
            .fetch_one(&self.pool)
            .await
    }

    /// A review, provided it belongs to the given title
    pub async fn find(&self, title_id: i64, review_id: i64) -> sqlx::Result<Option<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews r JOIN users u ON u.id = r.author_id \
             WHERE r.title_id = $1 AND r.id = $2"
        );
        sqlx::query_as::<_, Review>(&sql)
            .bind(title_id)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Whether the author already reviewed the title
    pub async fn exists_for_author(&self, title_id: i64, author_id: i64) -> sqlx::Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE title_id = $1 AND author_id = $2)",
        )
        .bind(title_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn create(
        &self,
        title_id: i64,
        author_id: i64,
        text: &str,
        score: i16,
    ) -> sqlx::Result<Review> {
        info!("Creating review of title {} by user {}", title_id, author_id);

        let sql = format!(
            "WITH r AS (\
                INSERT INTO reviews (title_id, author_id, text, score) \
                VALUES ($1, $2, $3, $4) RETURNING *\
             ) SELECT {REVIEW_COLUMNS} FROM r JOIN users u ON u.id = r.author_id"
        );
        sqlx::query_as::<_, Review>(&sql)
            .bind(title_id)
            .bind(author_id)
            .bind(text)
            .bind(score)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn update(
        &self,
        review_id: i64,
        text: Option<&str>,
        score: Option<i16>,
    ) -> sqlx::Result<Option<Review>> {
        info!("Updating review {}", review_id);

        let sql = format!(
            "WITH r AS (\
                UPDATE reviews SET text = COALESCE($2, text), score = COALESCE($3, score) \
                WHERE id = $1 RETURNING *\
             ) SELECT {REVIEW_COLUMNS} FROM r JOIN users u ON u.id = r.author_id"
        );
        sqlx::query_as::<_, Review>(&sql)
            .bind(review_id)
            .bind(text)
            .bind(score)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn delete(&self, review_id: i64) -> sqlx::Result<bool> {
        info!("Deleting review {}", review_id);

        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
