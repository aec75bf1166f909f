//! Load the CSV data set into the database.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use api::importer::{DataFile, Importer, PgImportStore};
use common::database::{DatabaseConfig, init_pool, run_migrations};

#[derive(Debug, Parser)]
#[command(name = "import_csv", about = "Import YaMDb CSV files into the database")]
struct Args {
    /// Files to import (for example `users.csv`); all known files when omitted
    files: Vec<String>,

    /// Directory holding the CSV files
    #[arg(long, env = "IMPORT_DATA_DIR", default_value = "static/data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("Import aborted: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every row of every file was imported
async fn run(args: Args) -> anyhow::Result<bool> {
    let files = DataFile::resolve(&args.files)?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    run_migrations(&pool).await?;

    info!(
        "Importing {} file(s) from {}",
        files.len(),
        args.data_dir.display()
    );

    let importer = Importer::new(PgImportStore::new(pool), args.data_dir);
    let report = importer.run(&files).await;

    for file in &report.files {
        match &file.failure {
            Some(failure) => warn!("{}: failed ({})", file.file, failure),
            None => info!(
                "{}: imported {}, skipped {}",
                file.file,
                file.imported,
                file.skipped.len()
            ),
        }
    }

    info!(
        "Import finished: {} imported, {} skipped",
        report.imported(),
        report.skipped()
    );

    Ok(report.is_clean())
}
