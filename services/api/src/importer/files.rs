//! The CSV files the importer knows and the tables they fill

use std::fmt;

use super::ImportError;

/// Database table touched by an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Categories,
    Genres,
    Titles,
    TitleGenres,
    Reviews,
    Comments,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Categories => "categories",
            Table::Genres => "genres",
            Table::Titles => "titles",
            Table::TitleGenres => "title_genres",
            Table::Reviews => "reviews",
            Table::Comments => "comments",
        }
    }
}

/// Known data file, in the order rows must be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataFile {
    Users,
    Categories,
    Genres,
    Titles,
    GenreTitles,
    Reviews,
    Comments,
}

impl DataFile {
    /// Every file, referenced tables first
    pub const ALL: [DataFile; 7] = [
        DataFile::Users,
        DataFile::Categories,
        DataFile::Genres,
        DataFile::Titles,
        DataFile::GenreTitles,
        DataFile::Reviews,
        DataFile::Comments,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            DataFile::Users => "users.csv",
            DataFile::Categories => "category.csv",
            DataFile::Genres => "genre.csv",
            DataFile::Titles => "titles.csv",
            DataFile::GenreTitles => "genre_title.csv",
            DataFile::Reviews => "review.csv",
            DataFile::Comments => "comments.csv",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|file| file.file_name() == name)
    }

    pub fn table(self) -> Table {
        match self {
            DataFile::Users => Table::Users,
            DataFile::Categories => Table::Categories,
            DataFile::Genres => Table::Genres,
            DataFile::Titles => Table::Titles,
            DataFile::GenreTitles => Table::TitleGenres,
            DataFile::Reviews => Table::Reviews,
            DataFile::Comments => Table::Comments,
        }
    }

    /// Columns (after header normalisation) a file must provide
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            DataFile::Users => &["id", "username", "email"],
            DataFile::Categories | DataFile::Genres => &["id", "name", "slug"],
            DataFile::Titles => &["id", "name", "year"],
            DataFile::GenreTitles => &["id", "title", "genre"],
            DataFile::Reviews => &["id", "title", "text", "author", "score"],
            DataFile::Comments => &["id", "review", "text", "author"],
        }
    }

    /// Files to import for the given names.
    ///
    /// No names selects every file. Any unknown name fails the whole request
    /// so that nothing is imported. The result is deduplicated and ordered so
    /// that referenced tables load first.
    pub fn resolve(names: &[String]) -> Result<Vec<DataFile>, ImportError> {
        if names.is_empty() {
            return Ok(Self::ALL.to_vec());
        }

        let mut files = names
            .iter()
            .map(|name| {
                Self::from_file_name(name.trim())
                    .ok_or_else(|| ImportError::UnknownFile(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        files.sort();
        files.dedup();
        Ok(files)
    }
}

impl fmt::Display for DataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_names_selects_everything_in_order() {
        let files = DataFile::resolve(&[]).unwrap();
        assert_eq!(files, DataFile::ALL.to_vec());
        assert_eq!(files.first().map(|f| f.file_name()), Some("users.csv"));
        assert_eq!(files.last().map(|f| f.file_name()), Some("comments.csv"));
    }

    #[test]
    fn test_named_files_are_ordered_by_dependency() {
        let files = DataFile::resolve(&names(&["comments.csv", "users.csv", "review.csv", "users.csv"]))
            .unwrap();
        assert_eq!(
            files,
            vec![DataFile::Users, DataFile::Reviews, DataFile::Comments]
        );
    }

    #[test]
    fn test_unknown_name_rejects_the_request() {
        let err = DataFile::resolve(&names(&["users.csv", "ratings.csv"])).unwrap_err();
        assert!(matches!(err, ImportError::UnknownFile(name) if name == "ratings.csv"));
    }
}
