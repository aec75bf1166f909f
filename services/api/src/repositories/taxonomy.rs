//! Category and genre repository

use common::database::contains_pattern;
use sqlx::PgPool;
use tracing::info;

use crate::models::taxonomy::{Label, Taxonomy};

/// Repository over one of the label tables
#[derive(Clone)]
pub struct TaxonomyRepository {
    pool: PgPool,
    kind: Taxonomy,
}

impl TaxonomyRepository {
    pub fn new(pool: PgPool, kind: Taxonomy) -> Self {
        Self { pool, kind }
    }

    pub fn kind(&self) -> Taxonomy {
        self.kind
    }

    /// List labels ordered by name, optionally filtered by a name substring
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<Label>> {
        let sql = format!(
            "SELECT id, name, slug FROM {} \
             WHERE ($1::TEXT IS NULL OR name ILIKE $1) \
             ORDER BY name, id LIMIT $2 OFFSET $3",
            self.kind.table()
        );
        sqlx::query_as::<_, Label>(&sql)
            .bind(search.map(contains_pattern))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count(&self, search: Option<&str>) -> sqlx::Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE ($1::TEXT IS NULL OR name ILIKE $1)",
            self.kind.table()
        );
        sqlx::query_scalar(&sql)
            .bind(search.map(contains_pattern))
            .fetch_one(&self.pool)
            .await
    }

    pub async fn create(&self, name: &str, slug: &str) -> sqlx::Result<Label> {
        info!("Creating {} {}", self.kind.label(), slug);

        let sql = format!(
            "INSERT INTO {} (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
            self.kind.table()
        );
        sqlx::query_as::<_, Label>(&sql)
            .bind(name)
            .bind(slug)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn find_by_slug(&self, slug: &str) -> sqlx::Result<Option<Label>> {
        let sql = format!(
            "SELECT id, name, slug FROM {} WHERE slug = $1",
            self.kind.table()
        );
        sqlx::query_as::<_, Label>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    /// Labels matching any of the given slugs
    pub async fn find_by_slugs(&self, slugs: &[String]) -> sqlx::Result<Vec<Label>> {
        let sql = format!(
            "SELECT id, name, slug FROM {} WHERE slug = ANY($1) ORDER BY name",
            self.kind.table()
        );
        sqlx::query_as::<_, Label>(&sql)
            .bind(slugs)
            .fetch_all(&self.pool)
            .await
    }

    /// Delete a label by slug; returns whether a row was removed
    pub async fn delete_by_slug(&self, slug: &str) -> sqlx::Result<bool> {
        info!("Deleting {} {}", self.kind.label(), slug);

        let sql = format!("DELETE FROM {} WHERE slug = $1", self.kind.table());
        let result = sqlx::query(&sql).bind(slug).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }
}
