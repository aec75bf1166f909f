//! Authentication middleware for JWT token validation

use auth::models::{Capability, Role};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Caller identified by a valid bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn can(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }
}

/// Resolve the bearer token, if any, into a [`CurrentUser`] request extension.
///
/// Requests without a token pass through as anonymous. A token that fails
/// validation, or whose user no longer exists, is rejected with 401.
pub async fn authenticate(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        let claims = state
            .auth
            .jwt
            .validate_token(bearer.token())
            .map_err(|e| {
                warn!("Rejected bearer token: {}", e);
                ApiError::Unauthorized
            })?;

        // Role and existence come from the current row, not the token
        let user = state.users.find_by_id(claims.sub).await?.ok_or_else(|| {
            warn!("Bearer token for missing user {}", claims.sub);
            ApiError::Unauthorized
        })?;

        req.extensions_mut().insert(CurrentUser {
            id: user.id,
            username: user.username,
            role: user.role,
        });
    }

    Ok(next.run(req).await)
}

/// Requires an authenticated caller; use `Option<CurrentUser>` where
/// anonymous access is allowed.
#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}
