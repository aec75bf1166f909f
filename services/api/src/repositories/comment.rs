//! Comment repository

use sqlx::PgPool;
use tracing::info;

use crate::models::comment::Comment;

const COMMENT_COLUMNS: &str =
    "c.id, c.review_id, c.author_id, u.username AS author, c.text, c.pub_date";

#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Comments on a review, oldest first
    pub async fn list_for_review(
        &self,
        review_id: i64,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.review_id = $1 ORDER BY c.pub_date, c.id LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(review_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count_for_review(&self, review_id: i64) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = $1")
            .bind(review_id)
            .fetch_one(&self.pool)
            .await
    }

    /// A comment, provided it belongs to the given review
    pub async fn find(&self, review_id: i64, comment_id: i64) -> sqlx::Result<Option<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.review_id = $1 AND c.id = $2"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(review_id)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn create(&self, review_id: i64, author_id: i64, text: &str) -> sqlx::Result<Comment> {
        info!("Creating comment on review {} by user {}", review_id, author_id);

        let sql = format!(
            "WITH c AS (\
                INSERT INTO comments (review_id, author_id, text) VALUES ($1, $2, $3) RETURNING *\
             ) SELECT {COMMENT_COLUMNS} FROM c JOIN users u ON u.id = c.author_id"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(review_id)
            .bind(author_id)
            .bind(text)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn update(&self, comment_id: i64, text: &str) -> sqlx::Result<Option<Comment>> {
        info!("Updating comment {}", comment_id);

        let sql = format!(
            "WITH c AS (\
                UPDATE comments SET text = $2 WHERE id = $1 RETURNING *\
             ) SELECT {COMMENT_COLUMNS} FROM c JOIN users u ON u.id = c.author_id"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(comment_id)
            .bind(text)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn delete(&self, comment_id: i64) -> sqlx::Result<bool> {
        info!("Deleting comment {}", comment_id);

        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
