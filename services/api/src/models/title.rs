//! Titles: the reviewable works

use auth::validation::FieldErrors;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{check_text, nullable, taxonomy::LabelResponse};

pub const NAME_MAX_LEN: usize = 256;

/// Title row joined with its category and computed rating
#[derive(Debug, Clone, FromRow)]
pub struct TitleRecord {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    /// Mean review score, `None` without reviews
    pub rating: Option<f64>,
}

/// Genre attached to a title
#[derive(Debug, Clone, FromRow)]
pub struct TitleGenre {
    pub title_id: i64,
    pub name: String,
    pub slug: String,
}

/// Read representation of a title
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleResponse {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<LabelResponse>,
    pub category: Option<LabelResponse>,
}

impl TitleResponse {
    pub fn new(record: TitleRecord, genre: Vec<LabelResponse>) -> Self {
        let category = match (record.category_name, record.category_slug) {
            (Some(name), Some(slug)) => Some(LabelResponse { name, slug }),
            _ => None,
        };

        Self {
            id: record.id,
            name: record.name,
            year: record.year,
            rating: record.rating,
            description: record.description,
            genre,
            category,
        }
    }
}

/// List filters: `?category=<slug>&genre=<slug>&name=<part>&year=<n>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

/// Request to create a title; genres and category are given by slug
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTitleRequest {
    #[serde(default)]
    pub name: String,
    pub year: Option<i32>,
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    pub category: Option<String>,
}

impl CreateTitleRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check("name", check_text(&self.name, NAME_MAX_LEN));
        match self.year {
            Some(year) => errors.check("year", validate_year(year)),
            None => errors.add("year", "This field is required."),
        }
        if self.category.as_deref().is_none_or(|slug| slug.trim().is_empty()) {
            errors.add("category", "This field is required.");
        }
        errors.into_result()
    }
}

/// Partial update of a title; absent fields keep their value.
///
/// `description` and `category` may be sent as `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTitleRequest {
    pub name: Option<String>,
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub genre: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
}

impl UpdateTitleRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.check("name", check_text(name, NAME_MAX_LEN));
        }
        if let Some(year) = self.year {
            errors.check("year", validate_year(year));
        }
        errors.into_result()
    }
}

/// Release year may not lie in the future
pub fn validate_year(year: i32) -> Result<(), String> {
    let current = Utc::now().year();
    if year > current {
        return Err(format!("Year cannot be later than {}.", current));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: Option<(&str, &str)>, rating: Option<f64>) -> TitleRecord {
        TitleRecord {
            id: 3,
            name: "Solaris".to_string(),
            year: 1972,
            description: None,
            category_name: category.map(|(name, _)| name.to_string()),
            category_slug: category.map(|(_, slug)| slug.to_string()),
            rating,
        }
    }

    #[test]
    fn test_year_cannot_be_in_the_future() {
        let current = Utc::now().year();
        assert!(validate_year(current).is_ok());
        assert!(validate_year(1895).is_ok());
        assert!(validate_year(current + 1).is_err());
    }

    #[test]
    fn test_uncategorised_title_serializes_null_category() {
        let response = TitleResponse::new(record(None, None), Vec::new());
        let json = serde_json::to_value(&response).unwrap();

        assert!(json["category"].is_null());
        assert!(json["rating"].is_null());
        assert_eq!(json["genre"], serde_json::json!([]));
    }

    #[test]
    fn test_categorised_title_carries_rating() {
        let response = TitleResponse::new(record(Some(("Film", "movie")), Some(7.5)), Vec::new());

        assert_eq!(response.category.unwrap().slug, "movie");
        assert_eq!(response.rating, Some(7.5));
    }

    #[test]
    fn test_create_request_requires_year_and_category() {
        let request: CreateTitleRequest =
            serde_json::from_value(serde_json::json!({ "name": "Solaris" })).unwrap();
        let errors = request.validate().unwrap_err();

        assert!(errors.contains("year"));
        assert!(errors.contains("category"));
        assert!(!errors.contains("name"));
    }

    #[test]
    fn test_update_request_tells_null_from_absent() {
        let request: UpdateTitleRequest =
            serde_json::from_value(serde_json::json!({ "description": null })).unwrap();
        assert_eq!(request.description, Some(None));
        assert_eq!(request.category, None);

        let request: UpdateTitleRequest =
            serde_json::from_value(serde_json::json!({ "category": "film" })).unwrap();
        assert_eq!(request.category, Some(Some("film".to_string())));
        assert_eq!(request.description, None);
    }
}
