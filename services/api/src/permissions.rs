//! Permission policies applied by the handlers
//!
//! Each handler checks its policy for the requested [`Action`] before
//! touching the database, then checks the loaded object when the policy
//! depends on authorship. Anonymous callers that need credentials get 401;
//! authenticated callers without the required role get 403.

use auth::models::Capability;

use crate::{
    error::{ApiError, ApiResult},
    middleware::CurrentUser,
};

/// Operation requested on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Read-only actions
    pub fn is_safe(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

pub trait Policy {
    /// Check performed before the target object is loaded
    fn check(&self, user: Option<&CurrentUser>, action: Action) -> ApiResult<()>;

    /// Check performed against a loaded object written by `author_id`
    fn check_object(
        &self,
        user: Option<&CurrentUser>,
        action: Action,
        author_id: i64,
    ) -> ApiResult<()> {
        let _ = author_id;
        self.check(user, action)
    }
}

/// Categories, genres and titles: anyone reads, admins write
pub struct ReadOnlyOrAdmin;

/// Reviews and comments: anyone reads, signed-in users create, authors and
/// moderators change
pub struct AuthorOrModerator;

/// User management
pub struct AdminOnly;

/// Own profile
pub struct Authenticated;

impl Policy for ReadOnlyOrAdmin {
    fn check(&self, user: Option<&CurrentUser>, action: Action) -> ApiResult<()> {
        if action.is_safe() {
            return Ok(());
        }
        require_capability(user, Capability::Administer).map(|_| ())
    }
}

impl Policy for AuthorOrModerator {
    fn check(&self, user: Option<&CurrentUser>, action: Action) -> ApiResult<()> {
        if action.is_safe() {
            return Ok(());
        }
        require_capability(user, Capability::Write).map(|_| ())
    }

    fn check_object(
        &self,
        user: Option<&CurrentUser>,
        action: Action,
        author_id: i64,
    ) -> ApiResult<()> {
        if action.is_safe() {
            return Ok(());
        }
        let user = require_capability(user, Capability::Write)?;
        if user.id == author_id || user.can(Capability::Moderate) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

impl Policy for AdminOnly {
    fn check(&self, user: Option<&CurrentUser>, _action: Action) -> ApiResult<()> {
        require_capability(user, Capability::Administer).map(|_| ())
    }
}

impl Policy for Authenticated {
    fn check(&self, user: Option<&CurrentUser>, _action: Action) -> ApiResult<()> {
        user.map(|_| ()).ok_or(ApiError::Unauthorized)
    }
}

fn require_capability(
    user: Option<&CurrentUser>,
    capability: Capability,
) -> ApiResult<&CurrentUser> {
    let user = user.ok_or(ApiError::Unauthorized)?;
    if user.can(capability) {
        Ok(user)
    } else {
        Err(ApiError::Forbidden)
    }
}
