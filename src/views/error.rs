use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("Failed to read boundary file {0}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Boundary file {0} is not valid GeoJSON")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("Boundary file {0} has no \"features\" array")]
    NoFeatures(PathBuf),

    #[error("Background task failed while parsing boundaries")]
    TaskJoin(#[from] tokio::task::JoinError),
}
