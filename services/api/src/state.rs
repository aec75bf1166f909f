//! Application state shared across handlers

use auth::{AuthState, repositories::UserRepository};
use sqlx::PgPool;

use crate::{
    models::taxonomy::Taxonomy,
    repositories::{CommentRepository, ReviewRepository, TaxonomyRepository, TitleRepository},
    settings::Settings,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth: AuthState,
    pub users: UserRepository,
    pub categories: TaxonomyRepository,
    pub genres: TaxonomyRepository,
    pub titles: TitleRepository,
    pub reviews: ReviewRepository,
    pub comments: CommentRepository,
    pub page_size: i64,
}

impl AppState {
    pub fn new(pool: PgPool, auth: AuthState, settings: &Settings) -> Self {
        Self {
            users: auth.users.clone(),
            categories: TaxonomyRepository::new(pool.clone(), Taxonomy::Category),
            genres: TaxonomyRepository::new(pool.clone(), Taxonomy::Genre),
            titles: TitleRepository::new(pool.clone()),
            reviews: ReviewRepository::new(pool.clone()),
            comments: CommentRepository::new(pool.clone()),
            db_pool: pool,
            auth,
            page_size: settings.page_size,
        }
    }
}
