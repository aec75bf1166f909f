//! Reviews: scored opinions on a title, one per author

use auth::validation::FieldErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 10;

/// Review row joined with its author's username
#[derive(Debug, Clone, FromRow)]
pub struct Review {
    pub id: i64,
    pub title_id: i64,
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            text: review.text,
            author: review.author,
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewRequest {
    #[serde(default)]
    pub text: String,
    pub score: Option<i64>,
}

impl CreateReviewRequest {
    /// Validated score
    pub fn validate(&self) -> Result<i16, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.text.trim().is_empty() {
            errors.add("text", "This field may not be blank.");
        }
        let score = match self.score {
            Some(score) => validate_score(score),
            None => Err("This field is required.".to_string()),
        };
        match score {
            Ok(score) => {
                errors.into_result()?;
                Ok(score)
            }
            Err(message) => {
                errors.add("score", message);
                Err(errors)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReviewRequest {
    pub text: Option<String>,
    pub score: Option<i64>,
}

impl UpdateReviewRequest {
    /// Validated optional score
    pub fn validate(&self) -> Result<Option<i16>, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.text.as_deref().is_some_and(|text| text.trim().is_empty()) {
            errors.add("text", "This field may not be blank.");
        }
        let score = match self.score.map(validate_score).transpose() {
            Ok(score) => score,
            Err(message) => {
                errors.add("score", message);
                None
            }
        };
        errors.into_result()?;
        Ok(score)
    }
}

/// Scores are integers from 1 to 10
pub fn validate_score(score: i64) -> Result<i16, String> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(format!(
            "Score must be between {} and {}.",
            MIN_SCORE, MAX_SCORE
        ));
    }
    // In range, so the narrowing cannot fail.
    Ok(score as i16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        assert_eq!(validate_score(1), Ok(1));
        assert_eq!(validate_score(10), Ok(10));
        assert!(validate_score(0).is_err());
        assert!(validate_score(11).is_err());
        assert!(validate_score(-3).is_err());
        assert!(validate_score(i64::MAX).is_err());
    }

    #[test]
    fn test_create_requires_text_and_score() {
        let request = CreateReviewRequest {
            text: " ".to_string(),
            score: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.contains("text"));
        assert!(errors.contains("score"));

        let request = CreateReviewRequest {
            text: "Great".to_string(),
            score: Some(8),
        };
        assert_eq!(request.validate().unwrap(), 8);
    }

    #[test]
    fn test_update_validates_present_fields_only() {
        assert_eq!(UpdateReviewRequest::default().validate().unwrap(), None);

        let request = UpdateReviewRequest {
            text: None,
            score: Some(42),
        };
        assert!(request.validate().unwrap_err().contains("score"));
    }
}
