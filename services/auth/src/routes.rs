//! Signup and token exchange routes

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    confirmation::{self, ConfirmationConfig},
    error::{AuthError, AuthResult},
    jwt::{JwtConfig, JwtService},
    mailer::{self, Mailer},
    models::{NewUser, User},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
    validation::{FieldErrors, validate_email, validate_username},
};

/// State shared by the authentication handlers
#[derive(Clone)]
pub struct AuthState {
    pub users: UserRepository,
    pub jwt: Arc<JwtService>,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limiter: RateLimiter,
    pub confirmation: ConfirmationConfig,
}

impl AuthState {
    /// Build the state from environment configuration
    pub fn from_env(pool: PgPool) -> anyhow::Result<Self> {
        let jwt = JwtService::new(JwtConfig::from_env()?);

        Ok(Self {
            users: UserRepository::new(pool),
            jwt: Arc::new(jwt),
            mailer: mailer::mailer_from_env(),
            rate_limiter: RateLimiter::new(RateLimiterConfig::from_env()),
            confirmation: ConfirmationConfig::from_env(),
        })
    }
}

/// Request for a confirmation code
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
}

/// Echo of the registered pair
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub email: String,
    pub username: String,
}

/// Request to exchange a confirmation code for a token
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub confirmation_code: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Create the router for the authentication endpoints
pub fn create_router<S>(state: AuthState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/signup/", post(signup))
        .route("/token/", post(token))
        .with_state(state)
}

/// Register a user (or re-request a code) and mail a confirmation code
pub async fn signup(
    State(state): State<AuthState>,
    Json(payload): Json<SignupRequest>,
) -> AuthResult<impl IntoResponse> {
    let mut errors = FieldErrors::new();
    errors.check("email", validate_email(&payload.email));
    errors.check("username", validate_username(&payload.username));
    errors.into_result()?;

    let user = find_or_register(&state.users, &payload.username, &payload.email).await?;

    let issued = confirmation::issue_code(&state.confirmation, Utc::now())?;
    state
        .users
        .set_confirmation_code(user.id, &issued.hash, issued.expires_at)
        .await?;
    state
        .mailer
        .send_confirmation_code(&user.email, &user.username, &issued.code)
        .await?;

    info!("Confirmation code issued for {}", user.username);

    Ok((
        StatusCode::OK,
        Json(SignupResponse {
            email: user.email,
            username: user.username,
        }),
    ))
}

/// Existing user for the exact (username, email) pair, or a new registration.
///
/// A username or email already taken by a different account is a field error.
async fn find_or_register(
    users: &UserRepository,
    username: &str,
    email: &str,
) -> AuthResult<User> {
    let by_username = users.find_by_username(username).await?;
    if let Some(user) = by_username.as_ref() {
        if user.email == email {
            info!("Re-sending confirmation code to existing user {}", username);
            return Ok(user.clone());
        }
    }

    let mut errors = FieldErrors::new();
    if by_username.is_some() {
        errors.add("username", "A user with that username already exists.");
    }
    if users.find_by_email(email).await?.is_some() {
        errors.add("email", "A user with that email already exists.");
    }
    errors.into_result()?;

    let user = users.create(&NewUser::signup(username, email)).await?;
    Ok(user)
}

/// Exchange a confirmation code for an access token
pub async fn token(
    State(state): State<AuthState>,
    Json(payload): Json<TokenRequest>,
) -> AuthResult<impl IntoResponse> {
    let mut errors = FieldErrors::new();
    if payload.username.is_empty() {
        errors.add("username", "This field may not be blank.");
    }
    if payload.confirmation_code.trim().is_empty() {
        errors.add("confirmation_code", "This field may not be blank.");
    }
    errors.into_result()?;

    let user = state
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or_else(|| AuthError::UserNotFound(payload.username.clone()))?;

    if !state.rate_limiter.check(&user.username).await {
        warn!("Token exchange locked out for {}", user.username);
        return Err(AuthError::TooManyAttempts);
    }

    if let Err(err) = confirmation::verify_code(
        &payload.confirmation_code,
        user.confirmation_code_hash.as_deref(),
        user.confirmation_code_expires_at,
        Utc::now(),
    ) {
        warn!("Rejected confirmation code for {}", user.username);
        return Err(err);
    }

    // The stored hash was verified above; clearing it only succeeds once.
    let stored_hash = user.confirmation_code_hash.as_deref().unwrap_or_default();
    if !state
        .users
        .consume_confirmation_code(user.id, stored_hash)
        .await?
    {
        warn!("Confirmation code for {} was already used", user.username);
        return Err(AuthError::InvalidConfirmationCode);
    }

    state.rate_limiter.reset(&user.username).await;
    let token = state.jwt.generate_access_token(&user)?;
    info!("Issued access token for {}", user.username);

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}
