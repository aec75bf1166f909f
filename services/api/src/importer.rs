//! Bulk CSV import into the database.
//!
//! Files are loaded in dependency order. Every row is parsed and written on
//! its own: a bad row is recorded with its line number and skipped, and a file
//! that cannot be read is recorded as failed while the run moves on.

pub mod files;
pub mod record;
pub mod store;

use csv::{Reader, ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

pub use files::{DataFile, Table};
pub use record::{Row, RowError};
pub use store::{ImportStore, PgImportStore, StoreError};

use record::{Record, normalize_header, parse_row};

/// Errors that stop a file (or the whole request) from being imported
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unknown data file `{0}`")]
    UnknownFile(String),

    #[error("cannot read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("{file} is missing columns: {}", .missing.join(", "))]
    Header { file: String, missing: Vec<String> },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store refused the operation: {0}")]
    Store(String),
}

/// A row left out of the import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: RowError,
}

/// Outcome of one file
#[derive(Debug, Default)]
pub struct FileReport {
    pub file: String,
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
    pub failure: Option<String>,
}

impl FileReport {
    fn new(file: DataFile) -> Self {
        Self {
            file: file.file_name().to_string(),
            ..Default::default()
        }
    }
}

/// Outcome of a run
#[derive(Debug, Default)]
pub struct ImportReport {
    pub files: Vec<FileReport>,
}

impl ImportReport {
    /// No file failed and no row was skipped
    pub fn is_clean(&self) -> bool {
        self.files
            .iter()
            .all(|file| file.failure.is_none() && file.skipped.is_empty())
    }

    pub fn imported(&self) -> usize {
        self.files.iter().map(|file| file.imported).sum()
    }

    pub fn skipped(&self) -> usize {
        self.files.iter().map(|file| file.skipped.len()).sum()
    }
}

pub struct Importer<S> {
    store: S,
    data_dir: PathBuf,
}

impl<S: ImportStore> Importer<S> {
    pub fn new(store: S, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            data_dir: data_dir.into(),
        }
    }

    /// Import the given files from the data directory in order
    pub async fn run(&self, files: &[DataFile]) -> ImportReport {
        let mut report = ImportReport::default();

        for &file in files {
            let mut file_report = FileReport::new(file);
            if let Err(err) = self.import_file(file, &mut file_report).await {
                warn!("Import of {} failed: {}", file, err);
                file_report.failure = Some(err.to_string());
            }

            info!(
                file = %file,
                imported = file_report.imported,
                skipped = file_report.skipped.len(),
                "Finished import file"
            );
            report.files.push(file_report);
        }

        report
    }

    async fn import_file(&self, file: DataFile, report: &mut FileReport) -> Result<(), ImportError> {
        let path = self.data_dir.join(file.file_name());
        let handle = File::open(&path).map_err(|err| ImportError::Read {
            file: path.display().to_string(),
            source: csv::Error::from(err),
        })?;

        self.import_reader(file, handle, report).await
    }

    /// Import rows of `file` from any CSV source
    pub async fn import_reader<R: Read>(
        &self,
        file: DataFile,
        source: R,
        report: &mut FileReport,
    ) -> Result<(), ImportError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| read_error(file, source))?
            .iter()
            .map(normalize_header)
            .collect();

        let missing: Vec<String> = file
            .required_columns()
            .iter()
            .filter(|column| !headers.iter().any(|header| header == *column))
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::Header {
                file: file.file_name().to_string(),
                missing,
            });
        }

        let outcome = self.import_records(file, &mut reader, &headers, report).await;

        // Rows written before a failure still need the sequence moved past them
        let synced = self
            .store
            .sync_sequence(file.table())
            .await
            .map_err(into_import_error);

        outcome.and(synced)
    }

    async fn import_records<R: Read>(
        &self,
        file: DataFile,
        reader: &mut Reader<R>,
        headers: &[String],
        report: &mut FileReport,
    ) -> Result<(), ImportError> {
        for result in reader.records() {
            let raw = match result {
                Ok(raw) => raw,
                Err(err) if err.is_io_error() => return Err(read_error(file, err)),
                Err(err) => {
                    let line = err.position().map(|p| p.line()).unwrap_or_default();
                    skip(file, report, line, RowError::Malformed(err.to_string()));
                    continue;
                }
            };
            let line = raw.position().map(|p| p.line()).unwrap_or_default();

            let row = match parse_row(file, &Record::new(headers, &raw)) {
                Ok(row) => row,
                Err(reason) => {
                    skip(file, report, line, reason);
                    continue;
                }
            };

            match self.write_row(&row).await {
                Ok(None) => report.imported += 1,
                Ok(Some(reason)) => skip(file, report, line, reason),
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Insert a row; `Ok(Some(reason))` means the row was refused
    async fn write_row(&self, row: &Row) -> Result<Option<RowError>, ImportError> {
        for reference in row.references() {
            let exists = self
                .store
                .exists(reference.table, reference.id)
                .await
                .map_err(into_import_error)?;
            if !exists {
                return Ok(Some(RowError::MissingReference {
                    column: reference.column.to_string(),
                    table: reference.table.name(),
                    id: reference.id,
                }));
            }
        }

        match self.store.insert(row).await {
            Ok(()) => Ok(None),
            Err(StoreError::Rejected(reason)) => Ok(Some(RowError::Rejected(reason))),
            Err(StoreError::Database(err)) => Err(ImportError::Database(err)),
        }
    }
}

fn skip(file: DataFile, report: &mut FileReport, line: u64, reason: RowError) {
    warn!("Skipping {} line {}: {}", file, line, reason);
    report.skipped.push(SkippedRow { line, reason });
}

fn read_error(file: DataFile, source: csv::Error) -> ImportError {
    ImportError::Read {
        file: file.file_name().to_string(),
        source,
    }
}

fn into_import_error(err: StoreError) -> ImportError {
    match err {
        StoreError::Database(err) => ImportError::Database(err),
        StoreError::Rejected(reason) => ImportError::Store(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory store keeping ids per table and enforcing unique slugs
    #[derive(Default)]
    struct MemoryStore {
        ids: Mutex<HashMap<Table, HashSet<i64>>>,
        slugs: Mutex<HashSet<String>>,
        synced: Mutex<Vec<Table>>,
        unreachable_at: Option<i64>,
    }

    impl MemoryStore {
        fn with(table: Table, ids: &[i64]) -> Self {
            let store = Self::default();
            store
                .ids
                .lock()
                .unwrap()
                .insert(table, ids.iter().copied().collect());
            store
        }

        fn count(&self, table: Table) -> usize {
            self.ids
                .lock()
                .unwrap()
                .get(&table)
                .map_or(0, HashSet::len)
        }
    }

    fn table_of(row: &Row) -> Table {
        match row {
            Row::User(_) => Table::Users,
            Row::Category(_) => Table::Categories,
            Row::Genre(_) => Table::Genres,
            Row::Title(_) => Table::Titles,
            Row::GenreTitle(_) => Table::TitleGenres,
            Row::Review(_) => Table::Reviews,
            Row::Comment(_) => Table::Comments,
        }
    }

    #[async_trait]
    impl ImportStore for MemoryStore {
        async fn exists(&self, table: Table, id: i64) -> Result<bool, StoreError> {
            Ok(self
                .ids
                .lock()
                .unwrap()
                .get(&table)
                .is_some_and(|ids| ids.contains(&id)))
        }

        async fn insert(&self, row: &Row) -> Result<(), StoreError> {
            if self.unreachable_at == Some(row.id()) {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            if let Row::Category(label) | Row::Genre(label) = row {
                let key = format!("{:?}:{}", table_of(row), label.slug);
                if !self.slugs.lock().unwrap().insert(key) {
                    return Err(StoreError::Rejected("duplicate slug".to_string()));
                }
            }

            let mut ids = self.ids.lock().unwrap();
            if !ids.entry(table_of(row)).or_default().insert(row.id()) {
                return Err(StoreError::Rejected("duplicate id".to_string()));
            }
            Ok(())
        }

        async fn sync_sequence(&self, table: Table) -> Result<(), StoreError> {
            self.synced.lock().unwrap().push(table);
            Ok(())
        }
    }

    #[async_trait]
    impl<'a> ImportStore for &'a MemoryStore {
        async fn exists(&self, table: Table, id: i64) -> Result<bool, StoreError> {
            (**self).exists(table, id).await
        }

        async fn insert(&self, row: &Row) -> Result<(), StoreError> {
            (**self).insert(row).await
        }

        async fn sync_sequence(&self, table: Table) -> Result<(), StoreError> {
            (**self).sync_sequence(table).await
        }
    }

    async fn import(store: &MemoryStore, file: DataFile, csv: &str) -> FileReport {
        let importer = Importer::new(store, "unused");
        let mut report = FileReport::new(file);
        importer
            .import_reader(file, csv.as_bytes(), &mut report)
            .await
            .unwrap();
        report
    }

    #[tokio::test]
    async fn test_missing_category_skips_only_that_row() {
        let store = MemoryStore::with(Table::Categories, &[1, 2]);
        let csv = "id,name,year,category\n\
                   1,Solaris,1972,1\n\
                   2,Stalker,1979,99\n\
                   3,Mirror,1975,2\n";

        let report = import(&store, DataFile::Titles, csv).await;

        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 3);
        assert_eq!(
            report.skipped[0].reason,
            RowError::MissingReference {
                column: "category".to_string(),
                table: "categories",
                id: 99,
            }
        );
        assert_eq!(store.count(Table::Titles), 2);
        assert!(!store.ids.lock().unwrap()[&Table::Titles].contains(&2));
        assert_eq!(*store.synced.lock().unwrap(), vec![Table::Titles]);
    }

    #[tokio::test]
    async fn test_id_suffixed_headers_are_accepted() {
        let store = MemoryStore::with(Table::Titles, &[1]);
        store
            .ids
            .lock()
            .unwrap()
            .insert(Table::Genres, [1, 2].into_iter().collect());

        let csv = "id,title_id,genre_id\n1,1,1\n2,1,2\n";
        let report = import(&store, DataFile::GenreTitles, csv).await;

        assert_eq!(report.imported, 2);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_and_malformed_rows_are_skipped() {
        let store = MemoryStore::default();
        let csv = "id,name,slug\n\
                   1,Film,movie\n\
                   2,Movie,movie\n\
                   3,Bad Slug,not a slug\n\
                   4,Book,book\n";

        let report = import(&store, DataFile::Categories, csv).await;

        assert_eq!(report.imported, 2);
        let lines: Vec<u64> = report.skipped.iter().map(|row| row.line).collect();
        assert_eq!(lines, vec![3, 4]);
        assert!(matches!(report.skipped[0].reason, RowError::Rejected(_)));
        assert!(matches!(
            report.skipped[1].reason,
            RowError::InvalidValue { ref column, .. } if column == "slug"
        ));
    }

    #[tokio::test]
    async fn test_missing_header_fails_file() {
        let store = MemoryStore::default();
        let importer = Importer::new(&store, "unused");
        let mut report = FileReport::new(DataFile::Reviews);

        let err = importer
            .import_reader(DataFile::Reviews, "id,text\n1,Great\n".as_bytes(), &mut report)
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Header { ref missing, .. } if missing.contains(&"score".to_string())));
        assert_eq!(report.imported, 0);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_reported_and_run_continues() {
        let store = MemoryStore::default();
        let dir = std::env::temp_dir().join("import-run-continues");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("genre.csv"), "id,name,slug\n1,Drama,drama\n").unwrap();
        let _ = std::fs::remove_file(dir.join("category.csv"));

        let importer = Importer::new(&store, &dir);
        let report = importer
            .run(&[DataFile::Categories, DataFile::Genres])
            .await;

        assert_eq!(report.files.len(), 2);
        assert!(report.files[0].failure.is_some());
        assert_eq!(report.files[1].imported, 1);
        assert!(!report.is_clean());
        assert_eq!(report.imported(), 1);
    }

    #[tokio::test]
    async fn test_sequence_is_synced_when_file_fails_part_way() {
        let store = MemoryStore {
            unreachable_at: Some(2),
            ..Default::default()
        };
        let importer = Importer::new(&store, "unused");
        let mut report = FileReport::new(DataFile::Categories);
        let csv = "id,name,slug\n1,Film,film\n2,Music,music\n3,Book,book\n";

        let err = importer
            .import_reader(DataFile::Categories, csv.as_bytes(), &mut report)
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Database(_)));
        assert_eq!(report.imported, 1);
        assert_eq!(*store.synced.lock().unwrap(), vec![Table::Categories]);
    }

    #[test]
    fn test_clean_report() {
        let report = ImportReport {
            files: vec![FileReport {
                file: "users.csv".to_string(),
                imported: 3,
                ..Default::default()
            }],
        };
        assert!(report.is_clean());
        assert_eq!(report.skipped(), 0);
    }
}
