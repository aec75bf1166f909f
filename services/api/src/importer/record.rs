//! Parsing CSV records into typed rows

use auth::{
    models::Role,
    validation::{validate_email, validate_profile_name, validate_username},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use std::collections::HashMap;
use thiserror::Error;

use super::files::{DataFile, Table};
use crate::models::{check_text, review::validate_score, taxonomy, title};

/// Why a single row was not imported
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("missing value for column `{0}`")]
    MissingColumn(String),

    #[error("invalid `{column}` value {value:?}: {reason}")]
    InvalidValue {
        column: String,
        value: String,
        reason: String,
    },

    #[error("`{column}` refers to missing {table} id {id}")]
    MissingReference {
        column: String,
        table: &'static str,
        id: i64,
    },

    #[error("rejected by the database: {0}")]
    Rejected(String),

    #[error("unreadable record: {0}")]
    Malformed(String),
}

/// Normalise a header name: trim, lowercase and drop a trailing `_id`
pub fn normalize_header(header: &str) -> String {
    let header = header.trim().to_ascii_lowercase();
    match header.strip_suffix("_id") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => header,
    }
}

/// One CSV record keyed by normalised column name
#[derive(Debug, Clone)]
pub struct Record {
    values: HashMap<String, String>,
}

impl Record {
    pub fn new(headers: &[String], record: &StringRecord) -> Self {
        let values = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.trim().to_string()))
            .collect();
        Self { values }
    }

    /// Non-empty value of a column
    pub fn required(&self, column: &str) -> Result<&str, RowError> {
        self.optional(column)
            .ok_or_else(|| RowError::MissingColumn(column.to_string()))
    }

    /// Value of a column, `None` when absent or empty
    pub fn optional(&self, column: &str) -> Option<&str> {
        self.values
            .get(column)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn integer(&self, column: &str) -> Result<i64, RowError> {
        let value = self.required(column)?;
        value
            .parse()
            .map_err(|_| invalid(column, value, "not an integer"))
    }

    pub fn optional_integer(&self, column: &str) -> Result<Option<i64>, RowError> {
        match self.optional(column) {
            Some(_) => self.integer(column).map(Some),
            None => Ok(None),
        }
    }

    pub fn timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>, RowError> {
        let Some(value) = self.optional(column) else {
            return Ok(None);
        };

        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Ok(Some(parsed.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| Some(naive.and_utc()))
            .map_err(|_| invalid(column, value, "not an ISO 8601 timestamp"))
    }
}

fn invalid(column: &str, value: &str, reason: impl Into<String>) -> RowError {
    RowError::InvalidValue {
        column: column.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn checked(column: &str, value: &str, check: Result<(), String>) -> Result<(), RowError> {
    check.map_err(|reason| invalid(column, value, reason))
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub bio: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenreTitleRow {
    pub id: i64,
    pub title: i64,
    pub genre: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub id: i64,
    pub title: i64,
    pub author: i64,
    pub text: String,
    pub score: i16,
    pub pub_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRow {
    pub id: i64,
    pub review: i64,
    pub author: i64,
    pub text: String,
    pub pub_date: Option<DateTime<Utc>>,
}

/// A parsed row ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    User(UserRow),
    Category(LabelRow),
    Genre(LabelRow),
    Title(TitleRow),
    GenreTitle(GenreTitleRow),
    Review(ReviewRow),
    Comment(CommentRow),
}

/// Foreign key held by a row: column, referenced table and id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub column: &'static str,
    pub table: Table,
    pub id: i64,
}

impl Row {
    pub fn id(&self) -> i64 {
        match self {
            Row::User(row) => row.id,
            Row::Category(row) | Row::Genre(row) => row.id,
            Row::Title(row) => row.id,
            Row::GenreTitle(row) => row.id,
            Row::Review(row) => row.id,
            Row::Comment(row) => row.id,
        }
    }

    /// Rows this one points at, which must exist before it is inserted
    pub fn references(&self) -> Vec<Reference> {
        let reference = |column, table, id| Reference { column, table, id };
        match self {
            Row::User(_) | Row::Category(_) | Row::Genre(_) => Vec::new(),
            Row::Title(row) => row
                .category
                .map(|id| reference("category", Table::Categories, id))
                .into_iter()
                .collect(),
            Row::GenreTitle(row) => vec![
                reference("title", Table::Titles, row.title),
                reference("genre", Table::Genres, row.genre),
            ],
            Row::Review(row) => vec![
                reference("title", Table::Titles, row.title),
                reference("author", Table::Users, row.author),
            ],
            Row::Comment(row) => vec![
                reference("review", Table::Reviews, row.review),
                reference("author", Table::Users, row.author),
            ],
        }
    }
}

/// Parse and validate a record of the given file
pub fn parse_row(file: DataFile, record: &Record) -> Result<Row, RowError> {
    let id = record.integer("id")?;

    match file {
        DataFile::Users => {
            let username = record.required("username")?;
            checked("username", username, validate_username(username))?;
            let email = record.required("email")?;
            checked("email", email, validate_email(email))?;
            let role = match record.optional("role") {
                Some(role) => role
                    .parse::<Role>()
                    .map_err(|reason: String| invalid("role", role, reason))?,
                None => Role::default(),
            };

            let first_name = record.optional("first_name").unwrap_or_default();
            checked("first_name", first_name, validate_profile_name(first_name))?;
            let last_name = record.optional("last_name").unwrap_or_default();
            checked("last_name", last_name, validate_profile_name(last_name))?;

            Ok(Row::User(UserRow {
                id,
                username: username.to_string(),
                email: email.to_string(),
                role,
                bio: record.optional("bio").unwrap_or_default().to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            }))
        }
        DataFile::Categories | DataFile::Genres => {
            let name = record.required("name")?;
            checked("name", name, check_text(name, taxonomy::NAME_MAX_LEN))?;
            let slug = record.required("slug")?;
            checked("slug", slug, taxonomy::validate_slug(slug))?;

            let row = LabelRow {
                id,
                name: name.to_string(),
                slug: slug.to_string(),
            };
            Ok(if file == DataFile::Categories {
                Row::Category(row)
            } else {
                Row::Genre(row)
            })
        }
        DataFile::Titles => {
            let name = record.required("name")?;
            checked("name", name, check_text(name, title::NAME_MAX_LEN))?;
            let year_value = record.required("year")?;
            let year: i32 = year_value
                .parse()
                .map_err(|_| invalid("year", year_value, "not an integer"))?;
            checked("year", year_value, title::validate_year(year))?;

            Ok(Row::Title(TitleRow {
                id,
                name: name.to_string(),
                year,
                description: record.optional("description").map(str::to_string),
                category: record.optional_integer("category")?,
            }))
        }
        DataFile::GenreTitles => Ok(Row::GenreTitle(GenreTitleRow {
            id,
            title: record.integer("title")?,
            genre: record.integer("genre")?,
        })),
        DataFile::Reviews => {
            let score_value = record.required("score")?;
            let score = score_value
                .parse::<i64>()
                .map_err(|_| invalid("score", score_value, "not an integer"))
                .and_then(|score| {
                    validate_score(score).map_err(|reason| invalid("score", score_value, reason))
                })?;

            Ok(Row::Review(ReviewRow {
                id,
                title: record.integer("title")?,
                author: record.integer("author")?,
                text: record.required("text")?.to_string(),
                score,
                pub_date: record.timestamp("pub_date")?,
            }))
        }
        DataFile::Comments => Ok(Row::Comment(CommentRow {
            id,
            review: record.integer("review")?,
            author: record.integer("author")?,
            text: record.required("text")?.to_string(),
            pub_date: record.timestamp("pub_date")?,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        let headers: Vec<String> = pairs.iter().map(|(h, _)| normalize_header(h)).collect();
        let values = StringRecord::from(pairs.iter().map(|(_, v)| *v).collect::<Vec<_>>());
        Record::new(&headers, &values)
    }

    #[test]
    fn test_header_normalisation() {
        assert_eq!(normalize_header("title_id"), "title");
        assert_eq!(normalize_header(" Genre_ID "), "genre");
        assert_eq!(normalize_header("id"), "id");
        assert_eq!(normalize_header("author"), "author");
        assert_eq!(normalize_header("_id"), "_id");
    }

    #[test]
    fn test_review_row_with_references() {
        let row = parse_row(
            DataFile::Reviews,
            &record(&[
                ("id", "1"),
                ("title_id", "1"),
                ("text", "Sublime"),
                ("author", "100"),
                ("score", "10"),
                ("pub_date", "2019-09-24T21:08:21.567Z"),
            ]),
        )
        .unwrap();

        assert_eq!(row.id(), 1);
        let references = row.references();
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].table, Table::Titles);
        assert_eq!(references[1].column, "author");
        assert_eq!(references[1].id, 100);

        let Row::Review(review) = row else {
            panic!("expected a review row");
        };
        assert_eq!(review.score, 10);
        assert!(review.pub_date.is_some());
    }

    #[test]
    fn test_out_of_range_score_is_invalid() {
        let err = parse_row(
            DataFile::Reviews,
            &record(&[
                ("id", "2"),
                ("title_id", "1"),
                ("text", "meh"),
                ("author", "100"),
                ("score", "11"),
            ]),
        )
        .unwrap_err();

        assert!(matches!(err, RowError::InvalidValue { column, .. } if column == "score"));
    }

    #[test]
    fn test_missing_and_malformed_values() {
        let err = parse_row(DataFile::Categories, &record(&[("id", "1"), ("name", "Film")]))
            .unwrap_err();
        assert_eq!(err, RowError::MissingColumn("slug".to_string()));

        let err = parse_row(
            DataFile::Titles,
            &record(&[("id", "x"), ("name", "Solaris"), ("year", "1972")]),
        )
        .unwrap_err();
        assert!(matches!(err, RowError::InvalidValue { column, .. } if column == "id"));
    }

    #[test]
    fn test_title_without_category_has_no_reference() {
        let row = parse_row(
            DataFile::Titles,
            &record(&[("id", "5"), ("name", "Solaris"), ("year", "1972"), ("category", "")]),
        )
        .unwrap();
        assert!(row.references().is_empty());
    }

    #[test]
    fn test_user_row_role_defaults_and_validation() {
        let row = parse_row(
            DataFile::Users,
            &record(&[("id", "100"), ("username", "bingobongo"), ("email", "bingo@yamdb.fake")]),
        )
        .unwrap();
        assert!(matches!(row, Row::User(UserRow { role: Role::User, .. })));

        let err = parse_row(
            DataFile::Users,
            &record(&[("id", "101"), ("username", "me"), ("email", "me@yamdb.fake")]),
        )
        .unwrap_err();
        assert!(matches!(err, RowError::InvalidValue { column, .. } if column == "username"));
    }

    #[test]
    fn test_over_long_values_are_invalid() {
        let long_name = "x".repeat(300);
        let err = parse_row(
            DataFile::Categories,
            &record(&[("id", "2"), ("name", long_name.as_str()), ("slug", "long")]),
        )
        .unwrap_err();
        assert!(matches!(err, RowError::InvalidValue { column, .. } if column == "name"));

        let err = parse_row(
            DataFile::Titles,
            &record(&[("id", "3"), ("name", long_name.as_str()), ("year", "1972")]),
        )
        .unwrap_err();
        assert!(matches!(err, RowError::InvalidValue { column, .. } if column == "name"));

        let long_last_name = "y".repeat(151);
        let err = parse_row(
            DataFile::Users,
            &record(&[
                ("id", "100"),
                ("username", "bingobongo"),
                ("email", "bingo@yamdb.fake"),
                ("last_name", long_last_name.as_str()),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, RowError::InvalidValue { column, .. } if column == "last_name"));
    }
}
