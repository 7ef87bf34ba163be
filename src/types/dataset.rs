//! The immutable set of forecast rows built once per day and shared by every view.

use crate::types::day_key::DayKey;
use crate::types::forecast_row::ForecastRow;
use crate::utils::normalize_code;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Where a dataset's humidity values came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// Fetched from the INMET forecast feed (directly or from that day's snapshot).
    Inmet,
    /// Built-in sample rows used when the feed could not be reached.
    Demo { reason: String },
}

/// A municipality entry for selection lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MunicipalityOption {
    pub code: String,
    pub label: String,
    pub state: String,
}

/// The day's forecast rows.
///
/// Rows are sanitised on construction: codes are normalised to seven digits, rows with
/// an unparsable code are dropped, `(code, date)` duplicates keep their first
/// occurrence, and the result is sorted by code then date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    day_key: DayKey,
    built_at: DateTime<Utc>,
    source: DataSource,
    rows: Vec<ForecastRow>,
}

impl Dataset {
    pub fn new(
        day_key: DayKey,
        built_at: DateTime<Utc>,
        source: DataSource,
        rows: Vec<ForecastRow>,
    ) -> Self {
        Self {
            day_key,
            built_at,
            source,
            rows: sanitize_rows(rows),
        }
    }

    pub fn day_key(&self) -> DayKey {
        self.day_key
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// `true` when the rows are demo data standing in for an unavailable feed.
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, DataSource::Demo { .. })
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows carrying an `RHmin` value.
    pub fn rh_min_count(&self) -> usize {
        self.rows.iter().filter(|r| r.rh_min.is_some()).count()
    }

    /// Distinct forecast dates, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows
            .iter()
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct state abbreviations, ascending.
    pub fn states(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|r| !r.state.is_empty())
            .map(|r| r.state.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct municipalities sorted by state then name, optionally limited to `states`.
    pub fn municipalities(&self, states: &[String]) -> Vec<MunicipalityOption> {
        let mut seen = HashSet::new();
        let mut options: Vec<MunicipalityOption> = self
            .rows
            .iter()
            .filter(|r| states.is_empty() || states.contains(&r.state))
            .filter(|r| seen.insert(r.code.as_str()))
            .map(|r| MunicipalityOption {
                code: r.code.clone(),
                label: r.display_name(),
                state: r.state.clone(),
            })
            .collect();
        options.sort_by(|a, b| a.state.cmp(&b.state).then_with(|| a.label.cmp(&b.label)));
        options
    }

    /// Rows of one municipality, ascending by date. The code is normalised first.
    pub fn rows_for(&self, code: &str) -> Vec<&ForecastRow> {
        match normalize_code(code) {
            Some(code) => self.rows.iter().filter(|r| r.code == code).collect(),
            None => Vec::new(),
        }
    }

    /// Brasília if present, otherwise the first municipality.
    pub fn default_municipality(&self) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.name.to_lowercase() == "brasília")
            .or_else(|| self.rows.first())
            .map(|r| r.code.as_str())
    }
}

fn sanitize_rows(rows: Vec<ForecastRow>) -> Vec<ForecastRow> {
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::with_capacity(rows.len());
    let mut cleaned: Vec<ForecastRow> = rows
        .into_iter()
        .filter_map(|mut row| {
            row.code = normalize_code(&row.code)?;
            row.rh_min = row.rh_min.filter(|v| v.is_finite());
            row.rh_max = row.rh_max.filter(|v| v.is_finite());
            seen.insert((row.code.clone(), row.date)).then_some(row)
        })
        .collect();
    cleaned.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.date.cmp(&b.date)));
    cleaned
}
