use crate::forecast::error::ForecastError;
use crate::municipalities::error::MunicipalityTableError;
use crate::settings::SettingsError;
use crate::views::error::BoundaryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    MunicipalityTable(#[from] MunicipalityTableError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Boundary(#[from] BoundaryError),
}
