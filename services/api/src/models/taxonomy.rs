//! Categories and genres: named, slugged labels for titles

use auth::validation::FieldErrors;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::OnceLock;

use super::check_text;

pub const NAME_MAX_LEN: usize = 256;
const SLUG_MAX_LEN: usize = 50;

/// Which label table a taxonomy entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taxonomy {
    Category,
    Genre,
}

impl Taxonomy {
    pub fn table(self) -> &'static str {
        match self {
            Taxonomy::Category => "categories",
            Taxonomy::Genre => "genres",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Taxonomy::Category => "category",
            Taxonomy::Genre => "genre",
        }
    }
}

/// Stored category or genre
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Label {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Public representation of a category or genre
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelResponse {
    pub name: String,
    pub slug: String,
}

impl From<Label> for LabelResponse {
    fn from(label: Label) -> Self {
        Self {
            name: label.name,
            slug: label.slug,
        }
    }
}

/// Request to create a category or genre
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLabelRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl CreateLabelRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check("name", check_text(&self.name, NAME_MAX_LEN));
        errors.check("slug", validate_slug(&self.slug));
        errors.into_result()
    }
}

/// Validate a slug: ASCII letters, digits, `-` and `_`
pub fn validate_slug(slug: &str) -> Result<(), String> {
    check_text(slug, SLUG_MAX_LEN)?;

    static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = SLUG_REGEX
        .get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("Failed to compile slug regex"));

    if !regex.is_match(slug) {
        return Err(
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens."
                .to_string(),
        );
    }

    Ok(())
}
