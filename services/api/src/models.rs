//! API models for request and response payloads

use serde::{Deserialize, Deserializer};

pub mod comment;
pub mod review;
pub mod taxonomy;
pub mod title;
pub mod user;

/// `?search=` filter shared by the category, genre and user lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

impl SearchQuery {
    /// Search term, ignoring an empty parameter
    pub fn term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// Tell an explicit `null` (`Some(None)`) apart from an absent field (`None`).
///
/// Pair with `#[serde(default)]` so a missing field stays `None`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Require a non-blank text field of bounded length
pub(crate) fn check_text(value: &str, max_len: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    if value.chars().count() > max_len {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            max_len
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_search_is_ignored() {
        let query = SearchQuery {
            search: Some("  ".to_string()),
        };
        assert_eq!(query.term(), None);

        let query = SearchQuery {
            search: Some(" drama ".to_string()),
        };
        assert_eq!(query.term(), Some("drama"));
    }

    #[test]
    fn test_check_text() {
        assert!(check_text("ok", 5).is_ok());
        assert!(check_text("   ", 5).is_err());
        assert!(check_text("too long", 5).is_err());
    }
}
