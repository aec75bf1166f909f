//! Input validation utilities

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Username reserved for the `/users/me/` profile endpoint
pub const RESERVED_USERNAME: &str = "me";

const USERNAME_MAX_LEN: usize = 150;
const EMAIL_MAX_LEN: usize = 254;
const PROFILE_NAME_MAX_LEN: usize = 150;

/// Validation messages keyed by field name.
///
/// Serializes to `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors holding a single message for a single field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record the error of a field check, if any
    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when no error was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("This field may not be blank.".to_string());
    }

    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            USERNAME_MAX_LEN
        ));
    }

    if username.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(format!(
            "Username \"{}\" is reserved and cannot be used.",
            RESERVED_USERNAME
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(
            "Username may contain only letters, digits and the characters @ . + - _".to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("This field may not be blank.".to_string());
    }

    if email.len() > EMAIL_MAX_LEN {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            EMAIL_MAX_LEN
        ));
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Enter a valid email address.".to_string());
    }

    Ok(())
}

/// Validate an optional profile name (first or last name)
pub fn validate_profile_name(name: &str) -> Result<(), String> {
    if name.chars().count() > PROFILE_NAME_MAX_LEN {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            PROFILE_NAME_MAX_LEN
        ));
    }

    Ok(())
}
