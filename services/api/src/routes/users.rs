//! User administration and profile endpoints

use auth::AuthError;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    middleware::CurrentUser,
    models::{
        SearchQuery,
        user::{CreateUserRequest, UpdateUserRequest, UserResponse},
    },
    pagination::{Page, Pagination},
    permissions::{Action, AdminOnly, Authenticated, Policy},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route("/users/me/", get(get_profile).patch(update_profile))
        .route(
            "/users/:username/",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

pub async fn list_users(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    pagination: Pagination,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Page<UserResponse>>> {
    AdminOnly.check(user.as_ref(), Action::List)?;

    let count = state.users.count(query.term()).await?;
    let users = state
        .users
        .list(query.term(), pagination.limit(), pagination.offset())
        .await?;

    let results = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(pagination.page(results, count)?))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    AdminOnly.check(user.as_ref(), Action::Create)?;
    let new_user = payload.into_new_user()?;

    let created = state
        .users
        .create(&new_user)
        .await
        .map_err(AuthError::from)?;

    info!("Created user {} with role {}", created.username, created.role);
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn get_user(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(username): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    AdminOnly.check(user.as_ref(), Action::Retrieve)?;

    let found = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(found.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(username): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    AdminOnly.check(user.as_ref(), Action::Update)?;
    let changes = payload.into_update(true)?;

    let target = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(ApiError::NotFound)?;

    let updated = state
        .users
        .update(target.id, &changes)
        .await
        .map_err(AuthError::from)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(updated.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    AdminOnly.check(user.as_ref(), Action::Delete)?;

    if state.users.delete_by_username(&username).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
) -> ApiResult<Json<UserResponse>> {
    Authenticated.check(user.as_ref(), Action::Retrieve)?;
    let user = user.ok_or(ApiError::Unauthorized)?;

    let profile = state
        .users
        .find_by_id(user.id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(profile.into()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    Authenticated.check(user.as_ref(), Action::Update)?;
    let user = user.ok_or(ApiError::Unauthorized)?;
    let changes = payload.into_update(false)?;

    let updated = state
        .users
        .update(user.id, &changes)
        .await
        .map_err(AuthError::from)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(updated.into()))
}
