//! User administration and profile payloads

use auth::{
    models::{NewUser, Role, UpdateUser, User},
    validation::{FieldErrors, validate_email, validate_profile_name, validate_username},
};
use serde::{Deserialize, Serialize};

/// Public representation of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

/// Admin request to create a user
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
    pub role: Option<String>,
}

impl CreateUserRequest {
    pub fn into_new_user(self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check("username", validate_username(&self.username));
        errors.check("email", validate_email(&self.email));
        errors.check("first_name", validate_profile_name(&self.first_name));
        errors.check("last_name", validate_profile_name(&self.last_name));
        let role = parse_role(self.role.as_deref(), &mut errors);
        errors.into_result()?;

        Ok(NewUser {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            role: role.unwrap_or_default(),
        })
    }
}

/// Partial update of a user, by an admin or by the user themselves
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
}

impl UpdateUserRequest {
    /// Validate and convert; a role change is ignored unless `allow_role`
    pub fn into_update(self, allow_role: bool) -> Result<UpdateUser, FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(username) = &self.username {
            errors.check("username", validate_username(username));
        }
        if let Some(email) = &self.email {
            errors.check("email", validate_email(email));
        }
        if let Some(first_name) = &self.first_name {
            errors.check("first_name", validate_profile_name(first_name));
        }
        if let Some(last_name) = &self.last_name {
            errors.check("last_name", validate_profile_name(last_name));
        }
        let role = if allow_role {
            parse_role(self.role.as_deref(), &mut errors)
        } else {
            None
        };
        errors.into_result()?;

        Ok(UpdateUser {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            role,
        })
    }
}

fn parse_role(role: Option<&str>, errors: &mut FieldErrors) -> Option<Role> {
    let role = role?;
    match role.parse() {
        Ok(role) => Some(role),
        Err(_) => {
            errors.add("role", format!("\"{}\" is not a valid choice.", role));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults_to_user_role() {
        let request: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "username": "reader",
            "email": "reader@example.com"
        }))
        .unwrap();

        let new_user = request.into_new_user().unwrap();
        assert_eq!(new_user.role, Role::User);
        assert_eq!(new_user.bio, "");
    }

    #[test]
    fn test_create_rejects_unknown_role_and_reserved_name() {
        let request: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "username": "me",
            "email": "me@example.com",
            "role": "superuser"
        }))
        .unwrap();

        let errors = request.into_new_user().unwrap_err();
        assert!(errors.contains("username"));
        assert!(errors.contains("role"));
    }

    #[test]
    fn test_self_update_cannot_change_role() {
        let request = UpdateUserRequest {
            bio: Some("I like films".to_string()),
            role: Some("admin".to_string()),
            ..Default::default()
        };

        let update = request.clone().into_update(false).unwrap();
        assert_eq!(update.role, None);
        assert_eq!(update.bio.as_deref(), Some("I like films"));

        let update = request.into_update(true).unwrap();
        assert_eq!(update.role, Some(Role::Admin));
    }
}
