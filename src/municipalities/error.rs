use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MunicipalityTableError {
    #[error("Municipality reference file '{0}' not found")]
    FileNotFound(PathBuf),

    #[error("Failed to open spreadsheet '{0}'")]
    SpreadsheetOpen(PathBuf, #[source] calamine::Error),

    #[error("Spreadsheet '{0}' has no worksheet")]
    NoWorksheet(PathBuf),

    #[error("Failed to read worksheet of '{0}'")]
    WorksheetRead(PathBuf, #[source] calamine::Error),

    #[error("Failed to read CSV file '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Failed processing column '{column}' of '{path}'")]
    ColumnProcessing {
        path: PathBuf,
        column: String,
        #[source]
        source: PolarsError,
    },

    #[error("Missing required column '{column}' in '{path}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("No usable municipality rows in '{0}'")]
    Empty(PathBuf),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
