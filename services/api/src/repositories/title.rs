//! Title repository
//!
//! Ratings are computed on read as the mean review score and are never
//! stored.

use common::database::contains_pattern;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::models::title::{TitleFilter, TitleGenre, TitleRecord};

const SELECT_TITLES: &str = "SELECT t.id, t.name, t.year, t.description, \
    c.name AS category_name, c.slug AS category_slug, \
    (SELECT AVG(r.score)::FLOAT8 FROM reviews r WHERE r.title_id = t.id) AS rating \
    FROM titles t LEFT JOIN categories c ON c.id = t.category_id";

/// Title to insert, with category and genres resolved to ids
#[derive(Debug, Clone)]
pub struct NewTitle {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub genre_ids: Vec<i64>,
}

/// Resolved partial update; `None` keeps the current value and `Some(None)`
/// clears a nullable column
#[derive(Debug, Clone, Default)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<Option<String>>,
    pub category_id: Option<Option<i64>>,
    pub genre_ids: Option<Vec<i64>>,
}

#[derive(Clone)]
pub struct TitleRepository {
    pool: PgPool,
}

impl TitleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Filtered page of titles ordered by id
    pub async fn list(
        &self,
        filter: &TitleFilter,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<TitleRecord>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_TITLES);
        push_filters(&mut query, filter);
        query.push(" ORDER BY t.id LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        query
            .build_query_as::<TitleRecord>()
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count(&self, filter: &TitleFilter) -> sqlx::Result<i64> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM titles t LEFT JOIN categories c ON c.id = t.category_id",
        );
        push_filters(&mut query, filter);

        query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
    }

    pub async fn find_by_id(&self, id: i64) -> sqlx::Result<Option<TitleRecord>> {
        let sql = format!("{SELECT_TITLES} WHERE t.id = $1");
        sqlx::query_as::<_, TitleRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn exists(&self, id: i64) -> sqlx::Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM titles WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    /// Genres of the given titles, ordered by name
    pub async fn genres_for(&self, title_ids: &[i64]) -> sqlx::Result<Vec<TitleGenre>> {
        sqlx::query_as::<_, TitleGenre>(
            "SELECT tg.title_id, g.name, g.slug FROM title_genres tg \
             JOIN genres g ON g.id = tg.genre_id \
             WHERE tg.title_id = ANY($1) ORDER BY g.name",
        )
        .bind(title_ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Insert a title and its genre links; returns the new id
    pub async fn create(&self, title: &NewTitle) -> sqlx::Result<i64> {
        info!("Creating title {}", title.name);

        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO titles (name, year, description, category_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&title.name)
        .bind(title.year)
        .bind(&title.description)
        .bind(title.category_id)
        .fetch_one(&mut *tx)
        .await?;

        link_genres(&mut tx, id, &title.genre_ids).await?;
        tx.commit().await?;

        Ok(id)
    }

    /// Apply a partial update; returns `false` when the title does not exist
    pub async fn update(&self, id: i64, changes: &TitleChanges) -> sqlx::Result<bool> {
        info!("Updating title {}", id);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE titles SET \
                name = COALESCE($2, name), \
                year = COALESCE($3, year), \
                description = CASE WHEN $4 THEN $5 ELSE description END, \
                category_id = CASE WHEN $6 THEN $7 ELSE category_id END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(changes.year)
        .bind(changes.description.is_some())
        .bind(changes.description.as_ref().and_then(|d| d.as_deref()))
        .bind(changes.category_id.is_some())
        .bind(changes.category_id.flatten())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(genre_ids) = &changes.genre_ids {
            sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_genres(&mut tx, id, genre_ids).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn delete(&self, id: i64) -> sqlx::Result<bool> {
        info!("Deleting title {}", id);

        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

async fn link_genres(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    title_id: i64,
    genre_ids: &[i64],
) -> sqlx::Result<()> {
    if genre_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO title_genres (title_id, genre_id) \
         SELECT $1, genre_id FROM UNNEST($2::BIGINT[]) AS genre_id \
         ON CONFLICT DO NOTHING",
    )
    .bind(title_id)
    .bind(genre_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &TitleFilter) {
    query.push(" WHERE TRUE");

    if let Some(category) = &filter.category {
        query.push(" AND c.slug = ");
        query.push_bind(category.clone());
    }
    if let Some(genre) = &filter.genre {
        query.push(
            " AND EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id \
             WHERE tg.title_id = t.id AND g.slug = ",
        );
        query.push_bind(genre.clone());
        query.push(")");
    }
    if let Some(name) = &filter.name {
        query.push(" AND t.name ILIKE ");
        query.push_bind(contains_pattern(name));
    }
    if let Some(year) = filter.year {
        query.push(" AND t.year = ");
        query.push_bind(year);
    }
}
