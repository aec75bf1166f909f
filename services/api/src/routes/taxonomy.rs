//! Category and genre endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use crate::{
    error::{ApiError, ApiResult},
    middleware::CurrentUser,
    models::{
        SearchQuery,
        taxonomy::{CreateLabelRequest, LabelResponse},
    },
    pagination::{Page, Pagination},
    permissions::{Action, Policy, ReadOnlyOrAdmin},
    repositories::TaxonomyRepository,
    routes::unique_as_field_error,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories/", get(list_categories).post(create_category))
        .route("/categories/:slug/", delete(delete_category))
        .route("/genres/", get(list_genres).post(create_genre))
        .route("/genres/:slug/", delete(delete_genre))
}

pub async fn list_categories(
    State(state): State<AppState>,
    pagination: Pagination,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Page<LabelResponse>>> {
    list_labels(&state.categories, &pagination, &query).await
}

pub async fn create_category(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Json(payload): Json<CreateLabelRequest>,
) -> ApiResult<impl IntoResponse> {
    create_label(&state.categories, user.as_ref(), payload).await
}

pub async fn delete_category(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    delete_label(&state.categories, user.as_ref(), &slug).await
}

pub async fn list_genres(
    State(state): State<AppState>,
    pagination: Pagination,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Page<LabelResponse>>> {
    list_labels(&state.genres, &pagination, &query).await
}

pub async fn create_genre(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Json(payload): Json<CreateLabelRequest>,
) -> ApiResult<impl IntoResponse> {
    create_label(&state.genres, user.as_ref(), payload).await
}

pub async fn delete_genre(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    delete_label(&state.genres, user.as_ref(), &slug).await
}

async fn list_labels(
    repository: &TaxonomyRepository,
    pagination: &Pagination,
    query: &SearchQuery,
) -> ApiResult<Json<Page<LabelResponse>>> {
    let count = repository.count(query.term()).await?;
    let labels = repository
        .list(query.term(), pagination.limit(), pagination.offset())
        .await?;

    let results = labels.into_iter().map(LabelResponse::from).collect();
    Ok(Json(pagination.page(results, count)?))
}

async fn create_label(
    repository: &TaxonomyRepository,
    user: Option<&CurrentUser>,
    payload: CreateLabelRequest,
) -> ApiResult<(StatusCode, Json<LabelResponse>)> {
    ReadOnlyOrAdmin.check(user, Action::Create)?;
    payload.validate()?;

    let kind = repository.kind();
    let label = repository
        .create(payload.name.trim(), &payload.slug)
        .await
        .map_err(|e| unique_as_field_error(e, kind.table(), kind.label()))?;

    Ok((StatusCode::CREATED, Json(label.into())))
}

async fn delete_label(
    repository: &TaxonomyRepository,
    user: Option<&CurrentUser>,
    slug: &str,
) -> ApiResult<StatusCode> {
    ReadOnlyOrAdmin.check(user, Action::Delete)?;

    if repository.delete_by_slug(slug).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
