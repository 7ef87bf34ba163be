//! The per-municipality, per-date forecast record and the static municipality entry it is
//! joined against.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A municipality from the static reference table.
///
/// Coordinates always come from this table; the forecast feed only supplies humidity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Municipality {
    /// Seven-digit IBGE code (e.g. `"5300108"` for Brasília).
    pub code: String,
    pub name: String,
    /// Federative unit abbreviation (`"DF"`, `"SP"`, ...).
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One forecast day for one municipality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    /// Seven-digit IBGE code.
    pub code: String,
    pub name: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDate,
    /// Minimum relative humidity in percent, if the feed had a value for this day.
    pub rh_min: Option<f64>,
    /// Maximum relative humidity in percent. The INMET feed does not fill it.
    pub rh_max: Option<f64>,
}

impl ForecastRow {
    /// Builds a row for `municipality`, copying its identity and coordinates.
    pub fn for_municipality(
        municipality: &Municipality,
        date: NaiveDate,
        rh_min: Option<f64>,
        rh_max: Option<f64>,
    ) -> Self {
        Self {
            code: municipality.code.clone(),
            name: municipality.name.clone(),
            state: municipality.state.clone(),
            latitude: municipality.latitude,
            longitude: municipality.longitude,
            date,
            rh_min,
            rh_max,
        }
    }

    /// `"<name> / <UF>"`, the label used by dropdowns and listings.
    pub fn display_name(&self) -> String {
        format!("{} / {}", self.name, self.state)
    }
}
