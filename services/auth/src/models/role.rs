//! Role model and the capabilities each role grants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User role, stored as the `user_role` PostgreSQL enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

/// What a caller may do with a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// List and retrieve public resources
    Read,
    /// Create resources and change the ones the caller authored
    Write,
    /// Change or delete any review or comment
    Moderate,
    /// Manage users, categories, genres and titles
    Administer,
}

impl Role {
    /// Whether this role grants the given capability.
    ///
    /// Anonymous callers have no role and only get [`Capability::Read`].
    pub fn grants(self, capability: Capability) -> bool {
        match capability {
            Capability::Read | Capability::Write => true,
            Capability::Moderate => matches!(self, Role::Moderator | Role::Admin),
            Capability::Administer => self == Role::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("\"{}\" is not a valid role", other)),
        }
    }
}
