//! Page-number pagination for list endpoints
//!
//! Lists take `?page=N` (1-based) and answer with
//! `{count, next, previous, results}`. The `next` and `previous` links keep
//! every other query parameter of the request.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{Uri, request::Parts},
};
use serde::Serialize;
use url::form_urlencoded;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

const PAGE_PARAM: &str = "page";

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Requested page, resolved against the configured page size
#[derive(Debug, Clone)]
pub struct Pagination {
    pub number: i64,
    pub size: i64,
    uri: Uri,
}

impl Pagination {
    /// Read the page number from the request URI.
    ///
    /// A page number that is not a positive integer is a 404, like a page
    /// past the end.
    pub fn from_uri(uri: &Uri, size: i64) -> ApiResult<Self> {
        let number = match query_pairs(uri).find(|(key, _)| key == PAGE_PARAM) {
            None => 1,
            Some((_, value)) => value
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or(ApiError::NotFound)?,
        };

        Ok(Self {
            number,
            size,
            uri: uri.clone(),
        })
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1).saturating_mul(self.size)
    }

    /// Wrap the fetched results; 404 when the page lies past the last one
    pub fn page<T>(&self, results: Vec<T>, count: i64) -> ApiResult<Page<T>> {
        if self.number > 1 && self.offset() >= count {
            return Err(ApiError::NotFound);
        }

        let next = (self.number.saturating_mul(self.size) < count).then(|| self.link(self.number + 1));
        let previous = (self.number > 1).then(|| self.link(self.number - 1));

        Ok(Page {
            count,
            next,
            previous,
            results,
        })
    }

    /// Request path with the page parameter rewritten; page 1 drops it
    fn link(&self, number: i64) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(query_pairs(&self.uri).filter(|(key, _)| key != PAGE_PARAM));
        if number > 1 {
            serializer.append_pair(PAGE_PARAM, &number.to_string());
        }
        let query = serializer.finish();

        if query.is_empty() {
            self.uri.path().to_string()
        } else {
            format!("{}?{}", self.uri.path(), query)
        }
    }
}

fn query_pairs(uri: &Uri) -> impl Iterator<Item = (String, String)> + '_ {
    form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Pagination {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Nested routers see a stripped path; links need the full one
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        Pagination::from_uri(uri, state.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination(uri: &str, size: i64) -> ApiResult<Pagination> {
        Pagination::from_uri(&uri.parse::<Uri>().unwrap(), size)
    }

    #[test]
    fn test_defaults_to_first_page() {
        let p = pagination("/api/v1/titles/", 10).unwrap();
        assert_eq!(p.number, 1);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn test_invalid_page_numbers_are_not_found() {
        for uri in ["/t/?page=0", "/t/?page=-2", "/t/?page=abc", "/t/?page="] {
            assert!(matches!(pagination(uri, 10), Err(ApiError::NotFound)), "{}", uri);
        }
    }

    #[test]
    fn test_links_keep_filters() {
        let p = pagination("/api/v1/titles/?genre=drama&page=2&year=1999", 10).unwrap();
        assert_eq!(p.offset(), 10);

        let page = p.page(vec![1; 10], 35).unwrap();
        assert_eq!(page.count, 35);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/v1/titles/?genre=drama&year=1999&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/v1/titles/?genre=drama&year=1999")
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let p = pagination("/c/?page=4", 10).unwrap();
        let page = p.page(vec![1; 5], 35).unwrap();
        assert!(page.next.is_none());
        assert_eq!(page.previous.as_deref(), Some("/c/?page=3"));
    }

    #[test]
    fn test_empty_first_page_is_allowed() {
        let page = pagination("/c/", 10).unwrap().page(Vec::<i32>::new(), 0).unwrap();
        assert_eq!(page.count, 0);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }

    #[test]
    fn test_page_past_the_end_is_not_found() {
        let p = pagination("/c/?page=5", 10).unwrap();
        assert!(matches!(p.page(Vec::<i32>::new(), 35), Err(ApiError::NotFound)));
    }
}
