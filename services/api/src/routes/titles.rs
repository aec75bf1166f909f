//! Title endpoints

use auth::validation::FieldErrors;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use std::collections::HashMap;

use crate::{
    error::{ApiError, ApiResult},
    middleware::CurrentUser,
    models::{
        taxonomy::LabelResponse,
        title::{CreateTitleRequest, TitleFilter, TitleRecord, TitleResponse, UpdateTitleRequest},
    },
    pagination::{Page, Pagination},
    permissions::{Action, Policy, ReadOnlyOrAdmin},
    repositories::title::{NewTitle, TitleChanges},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/titles/", get(list_titles).post(create_title))
        .route(
            "/titles/:title_id/",
            get(get_title).patch(update_title).delete(delete_title),
        )
}

pub async fn list_titles(
    State(state): State<AppState>,
    pagination: Pagination,
    Query(filter): Query<TitleFilter>,
) -> ApiResult<Json<Page<TitleResponse>>> {
    let count = state.titles.count(&filter).await?;
    let records = state
        .titles
        .list(&filter, pagination.limit(), pagination.offset())
        .await?;

    let results = with_genres(&state, records).await?;
    Ok(Json(pagination.page(results, count)?))
}

pub async fn get_title(
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
) -> ApiResult<Json<TitleResponse>> {
    Ok(Json(load_title(&state, title_id).await?))
}

pub async fn create_title(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Json(payload): Json<CreateTitleRequest>,
) -> ApiResult<(StatusCode, Json<TitleResponse>)> {
    ReadOnlyOrAdmin.check(user.as_ref(), Action::Create)?;
    payload.validate()?;

    let mut errors = FieldErrors::new();
    let category_id = match payload.category.as_deref() {
        Some(slug) => resolve_category(&state, slug, &mut errors).await?,
        None => None,
    };
    let genre_ids = resolve_genres(&state, &payload.genre, &mut errors).await?;
    errors.into_result()?;

    let id = state
        .titles
        .create(&NewTitle {
            name: payload.name.trim().to_string(),
            year: payload.year.unwrap_or_default(),
            description: payload.description,
            category_id,
            genre_ids,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(load_title(&state, id).await?)))
}

pub async fn update_title(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(title_id): Path<i64>,
    Json(payload): Json<UpdateTitleRequest>,
) -> ApiResult<Json<TitleResponse>> {
    ReadOnlyOrAdmin.check(user.as_ref(), Action::Update)?;
    payload.validate()?;

    let mut errors = FieldErrors::new();
    let category_id = match &payload.category {
        Some(Some(slug)) => Some(resolve_category(&state, slug, &mut errors).await?),
        Some(None) => Some(None),
        None => None,
    };
    let genre_ids = match &payload.genre {
        Some(slugs) => Some(resolve_genres(&state, slugs, &mut errors).await?),
        None => None,
    };
    errors.into_result()?;

    let changes = TitleChanges {
        name: payload.name.map(|name| name.trim().to_string()),
        year: payload.year,
        description: payload.description,
        category_id,
        genre_ids,
    };

    if !state.titles.update(title_id, &changes).await? {
        return Err(ApiError::NotFound);
    }

    Ok(Json(load_title(&state, title_id).await?))
}

pub async fn delete_title(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(title_id): Path<i64>,
) -> ApiResult<StatusCode> {
    ReadOnlyOrAdmin.check(user.as_ref(), Action::Delete)?;

    if state.titles.delete(title_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn load_title(state: &AppState, title_id: i64) -> ApiResult<TitleResponse> {
    let record = state
        .titles
        .find_by_id(title_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let mut titles = with_genres(state, vec![record]).await?;
    titles.pop().ok_or(ApiError::NotFound)
}

/// Attach genres to title records with a single lookup
async fn with_genres(state: &AppState, records: Vec<TitleRecord>) -> ApiResult<Vec<TitleResponse>> {
    let ids: Vec<i64> = records.iter().map(|record| record.id).collect();

    let mut genres: HashMap<i64, Vec<LabelResponse>> = HashMap::new();
    for genre in state.titles.genres_for(&ids).await? {
        genres.entry(genre.title_id).or_default().push(LabelResponse {
            name: genre.name,
            slug: genre.slug,
        });
    }

    Ok(records
        .into_iter()
        .map(|record| {
            let title_genres = genres.remove(&record.id).unwrap_or_default();
            TitleResponse::new(record, title_genres)
        })
        .collect())
}

async fn resolve_category(
    state: &AppState,
    slug: &str,
    errors: &mut FieldErrors,
) -> ApiResult<Option<i64>> {
    match state.categories.find_by_slug(slug).await? {
        Some(category) => Ok(Some(category.id)),
        None => {
            errors.add("category", missing_slug(slug));
            Ok(None)
        }
    }
}

async fn resolve_genres(
    state: &AppState,
    slugs: &[String],
    errors: &mut FieldErrors,
) -> ApiResult<Vec<i64>> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }

    let found = state.genres.find_by_slugs(slugs).await?;
    for slug in slugs {
        if !found.iter().any(|genre| &genre.slug == slug) {
            errors.add("genre", missing_slug(slug));
        }
    }

    Ok(found.into_iter().map(|genre| genre.id).collect())
}

fn missing_slug(slug: &str) -> String {
    format!("Object with slug={} does not exist.", slug)
}
