//! Comment endpoints, nested under a review

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

use auth::validation::FieldErrors;

use crate::{
    error::{ApiError, ApiResult},
    middleware::CurrentUser,
    models::comment::{Comment, CommentRequest, CommentResponse, UpdateCommentRequest},
    pagination::{Page, Pagination},
    permissions::{Action, AuthorOrModerator, Policy},
    routes::reviews::find_review,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/titles/:title_id/reviews/:review_id/comments/",
            get(list_comments).post(create_comment),
        )
        .route(
            "/titles/:title_id/reviews/:review_id/comments/:comment_id/",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
}

pub async fn list_comments(
    State(state): State<AppState>,
    pagination: Pagination,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Page<CommentResponse>>> {
    let review = find_review(&state, title_id, review_id).await?;

    let count = state.comments.count_for_review(review.id).await?;
    let comments = state
        .comments
        .list_for_review(review.id, pagination.limit(), pagination.offset())
        .await?;

    let results = comments.into_iter().map(CommentResponse::from).collect();
    Ok(Json(pagination.page(results, count)?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    AuthorOrModerator.check(user.as_ref(), Action::Create)?;
    let user = user.ok_or(ApiError::Unauthorized)?;
    let text = required_text(Some(&payload.text))?;

    let review = find_review(&state, title_id, review_id).await?;
    let comment = state.comments.create(review.id, user.id, text).await?;

    Ok((StatusCode::CREATED, Json(comment.into())))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> ApiResult<Json<CommentResponse>> {
    let comment = find_comment(&state, title_id, review_id, comment_id).await?;
    Ok(Json(comment.into()))
}

pub async fn update_comment(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> ApiResult<Json<CommentResponse>> {
    AuthorOrModerator.check(user.as_ref(), Action::Update)?;

    let comment = find_comment(&state, title_id, review_id, comment_id).await?;
    AuthorOrModerator.check_object(user.as_ref(), Action::Update, comment.author_id)?;

    let Some(text) = payload.text.as_deref() else {
        return Ok(Json(comment.into()));
    };
    let text = required_text(Some(text))?;

    let updated = state
        .comments
        .update(comment.id, text)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(updated.into()))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> ApiResult<StatusCode> {
    AuthorOrModerator.check(user.as_ref(), Action::Delete)?;

    let comment = find_comment(&state, title_id, review_id, comment_id).await?;
    AuthorOrModerator.check_object(user.as_ref(), Action::Delete, comment.author_id)?;

    if state.comments.delete(comment.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn find_comment(
    state: &AppState,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
) -> ApiResult<Comment> {
    let review = find_review(state, title_id, review_id).await?;
    state
        .comments
        .find(review.id, comment_id)
        .await?
        .ok_or(ApiError::NotFound)
}

fn required_text(text: Option<&str>) -> ApiResult<&str> {
    match text.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(FieldErrors::single("text", "This field may not be blank.").into()),
    }
}
