//! API service routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use common::error::{ConstraintViolation, constraint_violation};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use auth::validation::FieldErrors;

use crate::{error::ApiError, middleware::authenticate, state::AppState};

pub mod comments;
pub mod reviews;
pub mod taxonomy;
pub mod titles;
pub mod users;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::create_router(state.auth.clone()))
        .merge(taxonomy::router())
        .merge(titles::router())
        .merge(reviews::router())
        .merge(comments::router())
        .merge(users::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match common::database::health_check(&state.db_pool).await {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "ok" })),
        ),
        Ok(false) | Err(_) => {
            error!("Health check failed: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unreachable" })),
            )
        }
    }
}

/// Report a unique violation on `uq_<table>_<field>` as a field error
pub(crate) fn unique_as_field_error(err: sqlx::Error, table: &str, entity: &str) -> ApiError {
    if let Some(ConstraintViolation::Unique(constraint)) = constraint_violation(&err) {
        let prefix = format!("uq_{}_", table);
        if let Some(field) = constraint.strip_prefix(&prefix) {
            return FieldErrors::single(
                field,
                format!("{} with this {} already exists.", entity, field),
            )
            .into();
        }
    }
    ApiError::Database(err)
}
