use crate::municipalities::error::MunicipalityTableError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(transparent)]
    MunicipalityTable(#[from] MunicipalityTableError),

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to decode forecast JSON from {0}")]
    JsonDecode(String, #[source] reqwest::Error),

    #[error("Forecast URL template '{0}' has no {{ibge}} placeholder")]
    InvalidUrlTemplate(String),

    #[error("Failed to create snapshot directory '{0}'")]
    SnapshotDirCreation(PathBuf, #[source] std::io::Error),

    #[error("I/O error on snapshot file '{0}'")]
    SnapshotIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error on snapshot file '{0}'")]
    SnapshotPolars(PathBuf, #[source] PolarsError),

    #[error("Snapshot '{path}' is missing column '{column}'")]
    SnapshotColumn {
        path: PathBuf,
        column: String,
        #[source]
        source: PolarsError,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
