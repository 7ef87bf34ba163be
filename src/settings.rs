//! Runtime configuration, layered from an optional `inmet-humidity.toml` and the
//! process environment.

use crate::forecast::inmet::DEFAULT_URL_TEMPLATE;
use crate::types::classification::ClassThresholds;
use crate::utils::get_cache_dir;
use config::{Config, Environment, File, FileFormat};
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Base name of the optional configuration file in the working directory.
pub const CONFIG_FILE_NAME: &str = "inmet-humidity";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String, #[source] std::net::AddrParseError),
}

/// Every field has a default, so an empty environment yields a working configuration.
///
/// Environment variables map to fields by lower-casing their name (`MAX_MUN` ->
/// `max_mun`); nested thresholds use a double underscore (`CLASSES__ALERT_MIN`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Municipality reference spreadsheet (xlsx/ods) or CSV.
    pub attr_xlsx: PathBuf,
    /// Optional municipality boundaries for the choropleth.
    pub geojson_path: PathBuf,
    /// Token required by `/refresh`. Empty disables the check.
    pub refresh_token: String,
    /// Only the first `max_mun` municipalities are fetched. 0 means all.
    pub max_mun: usize,
    pub inmet_forecast_url_template: String,
    /// Per-request timeout in seconds.
    pub request_timeout: f64,
    /// Concurrent forecast requests.
    pub max_workers: usize,
    pub host: String,
    pub port: u16,
    pub forecast_days: usize,
    pub snapshots: bool,
    pub snapshot_dir: Option<PathBuf>,
    pub classes: ClassThresholds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            attr_xlsx: PathBuf::from("arquivo_completo_brasil.xlsx"),
            geojson_path: PathBuf::from("municipios_br.geojson"),
            refresh_token: String::new(),
            max_mun: 0,
            inmet_forecast_url_template: DEFAULT_URL_TEMPLATE.to_string(),
            request_timeout: 8.0,
            max_workers: 16,
            host: "0.0.0.0".to_string(),
            port: 8060,
            forecast_days: 5,
            snapshots: true,
            snapshot_dir: None,
            classes: ClassThresholds::default(),
        }
    }
}

impl Settings {
    /// Loads `inmet-humidity.{toml,json,yaml,...}` from the working directory if present,
    /// then applies the process environment on top.
    pub fn load() -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(File::with_name(CONFIG_FILE_NAME).required(false))
            .add_source(env_source(None))
            .build()?;
        let settings: Settings = config.try_deserialize()?;
        settings.validated()
    }

    /// Like [`Settings::load`], with an explicit TOML file and environment map.
    pub fn from_sources(
        file: Option<&Path>,
        env: HashMap<String, String>,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        let config = builder.add_source(env_source(Some(env))).build()?;
        let settings: Settings = config.try_deserialize()?;
        settings.validated()
    }

    fn validated(self) -> Result<Self, SettingsError> {
        if !self.classes.is_ordered() {
            return Err(SettingsError::InvalidValue {
                field: "classes",
                reason: format!("thresholds must be strictly decreasing: {:?}", self.classes),
            });
        }
        if self.forecast_days == 0 {
            return Err(SettingsError::InvalidValue {
                field: "forecast_days",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.inmet_forecast_url_template.contains("{ibge}") {
            return Err(SettingsError::InvalidValue {
                field: "inmet_forecast_url_template",
                reason: "must contain the {ibge} placeholder".to_string(),
            });
        }
        Ok(self)
    }

    /// The request timeout, falling back to 8 s for non-positive values.
    pub fn request_timeout(&self) -> Duration {
        if self.request_timeout.is_finite() && self.request_timeout > 0.0 {
            Duration::from_secs_f64(self.request_timeout)
        } else {
            Duration::from_secs(8)
        }
    }

    /// `None` limit when `max_mun` is 0.
    pub fn municipality_limit(&self) -> Option<usize> {
        (self.max_mun > 0).then_some(self.max_mun)
    }

    /// Directory for day snapshots, or `None` when snapshots are off or no cache
    /// directory can be determined.
    pub fn snapshot_dir(&self) -> Option<PathBuf> {
        if !self.snapshots {
            return None;
        }
        match &self.snapshot_dir {
            Some(dir) => Some(dir.clone()),
            None => match get_cache_dir() {
                Ok(dir) => Some(dir.join("snapshots")),
                Err(e) => {
                    warn!("Snapshots disabled, no cache directory: {}", e);
                    None
                }
            },
        }
    }

    pub fn bind_address(&self) -> Result<SocketAddr, SettingsError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| SettingsError::InvalidAddress(self.host.clone(), e))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Values stay strings here; numeric and boolean fields are parsed when deserialized,
/// so string fields such as `REFRESH_TOKEN=007` keep their exact text.
fn env_source(source: Option<HashMap<String, String>>) -> Environment {
    Environment::default().separator("__").source(source)
}
