//! Review endpoints, nested under a title

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::warn;

use crate::{
    error::{ApiError, ApiResult},
    middleware::CurrentUser,
    models::review::{CreateReviewRequest, Review, ReviewResponse, UpdateReviewRequest},
    pagination::{Page, Pagination},
    permissions::{Action, AuthorOrModerator, Policy},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/titles/:title_id/reviews/",
            get(list_reviews).post(create_review),
        )
        .route(
            "/titles/:title_id/reviews/:review_id/",
            get(get_review).patch(update_review).delete(delete_review),
        )
}

pub async fn list_reviews(
    State(state): State<AppState>,
    pagination: Pagination,
    Path(title_id): Path<i64>,
) -> ApiResult<Json<Page<ReviewResponse>>> {
    ensure_title(&state, title_id).await?;

    let count = state.reviews.count_for_title(title_id).await?;
    let reviews = state
        .reviews
        .list_for_title(title_id, pagination.limit(), pagination.offset())
        .await?;

    let results = reviews.into_iter().map(ReviewResponse::from).collect();
    Ok(Json(pagination.page(results, count)?))
}

pub async fn create_review(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(title_id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<ReviewResponse>)> {
    AuthorOrModerator.check(user.as_ref(), Action::Create)?;
    let user = user.ok_or(ApiError::Unauthorized)?;
    let score = payload.validate()?;

    ensure_title(&state, title_id).await?;

    if state.reviews.exists_for_author(title_id, user.id).await? {
        warn!("{} tried to review title {} twice", user.username, title_id);
        return Err(ApiError::BadRequest(
            "You have already reviewed this title".to_string(),
        ));
    }

    let review = state
        .reviews
        .create(title_id, user.id, payload.text.trim(), score)
        .await?;

    Ok((StatusCode::CREATED, Json(review.into())))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> ApiResult<Json<ReviewResponse>> {
    let review = find_review(&state, title_id, review_id).await?;
    Ok(Json(review.into()))
}

pub async fn update_review(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> ApiResult<Json<ReviewResponse>> {
    AuthorOrModerator.check(user.as_ref(), Action::Update)?;
    let score = payload.validate()?;

    let review = find_review(&state, title_id, review_id).await?;
    AuthorOrModerator.check_object(user.as_ref(), Action::Update, review.author_id)?;

    let updated = state
        .reviews
        .update(review.id, payload.text.as_deref().map(str::trim), score)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(updated.into()))
}

pub async fn delete_review(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    AuthorOrModerator.check(user.as_ref(), Action::Delete)?;

    let review = find_review(&state, title_id, review_id).await?;
    AuthorOrModerator.check_object(user.as_ref(), Action::Delete, review.author_id)?;

    if state.reviews.delete(review.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn ensure_title(state: &AppState, title_id: i64) -> ApiResult<()> {
    if state.titles.exists(title_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound)
    }
}

pub(crate) async fn find_review(
    state: &AppState,
    title_id: i64,
    review_id: i64,
) -> ApiResult<Review> {
    state
        .reviews
        .find(title_id, review_id)
        .await?
        .ok_or(ApiError::NotFound)
}
