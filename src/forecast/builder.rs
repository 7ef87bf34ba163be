//! Produces the day's dataset: reference table + INMET forecasts, joined on IBGE code.

use crate::forecast::error::ForecastError;
use crate::forecast::inmet::{DayMap, InmetClient};
use crate::forecast::snapshot::SnapshotStore;
use crate::municipalities::table::MunicipalityTable;
use crate::types::dataset::{DataSource, Dataset};
use crate::types::day_key::DayKey;
use crate::types::forecast_row::{ForecastRow, Municipality};
use chrono::{NaiveDate, Utc};
use log::{info, warn};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;

/// What the cache asks a builder for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildRequest {
    pub day_key: DayKey,
    /// `true` for an explicit refresh: reusable intermediate results must be ignored.
    pub forced: bool,
}

impl BuildRequest {
    pub fn new(day_key: DayKey) -> Self {
        Self {
            day_key,
            forced: false,
        }
    }

    pub fn forced(day_key: DayKey) -> Self {
        Self {
            day_key,
            forced: true,
        }
    }
}

/// Something that can produce the dataset for a day.
pub trait DatasetBuilder: Send + Sync {
    fn build(
        &self,
        request: BuildRequest,
    ) -> impl Future<Output = Result<Dataset, ForecastError>> + Send;
}

/// Joins fetched day maps onto the reference table for the forecast window.
///
/// Every municipality of the table yields one row per date in `dates`; dates the feed
/// did not cover get `rh_min = None`. Forecast entries whose code is not in the table
/// are excluded, and their number is returned alongside the rows.
pub fn join_forecasts(
    table: &MunicipalityTable,
    forecasts: &HashMap<String, DayMap>,
    dates: &[NaiveDate],
) -> (Vec<ForecastRow>, usize) {
    let unmatched = forecasts.keys().filter(|code| !table.contains(code)).count();
    let empty = DayMap::new();

    let rows = table
        .iter()
        .flat_map(|municipality| {
            let days = forecasts.get(&municipality.code).unwrap_or(&empty);
            dates.iter().map(move |date| {
                let rh_min = days.get(date).copied().flatten();
                ForecastRow::for_municipality(municipality, *date, rh_min, None)
            })
        })
        .collect();

    (rows, unmatched)
}

/// Builds datasets from the INMET feed.
pub struct InmetDatasetBuilder {
    client: InmetClient,
    reference_path: PathBuf,
    max_municipalities: usize,
    forecast_days: usize,
    snapshots: Option<SnapshotStore>,
}

impl InmetDatasetBuilder {
    pub fn new(client: InmetClient, reference_path: PathBuf) -> Self {
        Self {
            client,
            reference_path,
            max_municipalities: 0,
            forecast_days: 5,
            snapshots: None,
        }
    }

    /// Only the first `limit` municipalities of the reference file are fetched (`0` = all).
    pub fn with_max_municipalities(mut self, limit: usize) -> Self {
        self.max_municipalities = limit;
        self
    }

    pub fn with_forecast_days(mut self, days: usize) -> Self {
        self.forecast_days = days.max(1);
        self
    }

    pub fn with_snapshots(mut self, store: SnapshotStore) -> Self {
        self.snapshots = Some(store);
        self
    }

    async fn load_table(&self) -> Result<MunicipalityTable, ForecastError> {
        Ok(MunicipalityTable::load(&self.reference_path)
            .await?
            .truncated(self.max_municipalities))
    }

    async fn fetch(
        &self,
        day_key: DayKey,
        table: &MunicipalityTable,
        dates: &[NaiveDate],
    ) -> Result<Dataset, ForecastError> {
        let codes: Vec<String> = table.iter().map(|m| m.code.clone()).collect();
        let forecasts = self.client.fetch_all(codes).await;

        let (rows, unmatched) = join_forecasts(table, &forecasts, dates);
        if unmatched > 0 {
            warn!(
                "Excluded {} forecasts without a reference-table entry",
                unmatched
            );
        }

        let dataset = Dataset::new(day_key, Utc::now(), DataSource::Inmet, rows);
        if dataset.rh_min_count() == 0 {
            warn!(
                "No humidity values in the INMET responses for {}; keeping empty values",
                day_key
            );
        }
        Ok(dataset)
    }
}

/// A snapshot is only reused when it holds one row per municipality of `table` for
/// exactly `dates`. A change of `MAX_MUN`, `FORECAST_DAYS` or the reference file
/// during the day therefore triggers a new fetch.
fn snapshot_matches(dataset: &Dataset, table: &MunicipalityTable, dates: &[NaiveDate]) -> bool {
    dataset.dates() == dates
        && dataset.len() == table.len() * dates.len()
        && dataset.rows().iter().all(|row| table.contains(&row.code))
}

impl DatasetBuilder for InmetDatasetBuilder {
    async fn build(&self, request: BuildRequest) -> Result<Dataset, ForecastError> {
        let table = self.load_table().await?;
        let dates = request.day_key.window(self.forecast_days);

        if let (Some(store), false) = (&self.snapshots, request.forced) {
            match store.load(request.day_key).await {
                Ok(Some(dataset)) if snapshot_matches(&dataset, &table, &dates) => {
                    return Ok(dataset)
                }
                Ok(Some(dataset)) => info!(
                    "Snapshot for {} has {} rows over {} dates, expected {} municipalities over {} dates; fetching again",
                    request.day_key,
                    dataset.len(),
                    dataset.dates().len(),
                    table.len(),
                    dates.len()
                ),
                Ok(None) => {}
                Err(e) => warn!("Ignoring unreadable snapshot for {}: {}", request.day_key, e),
            }
        }

        let dataset = self.fetch(request.day_key, &table, &dates).await?;

        if let Some(store) = &self.snapshots {
            if dataset.rh_min_count() > 0 {
                if let Err(e) = store.store(&dataset).await {
                    warn!("Failed to write snapshot for {}: {}", request.day_key, e);
                }
            }
        }
        Ok(dataset)
    }
}

/// Falls back to [`demo_dataset`] when the wrapped builder fails, so the panel keeps
/// serving a (flagged) degraded state instead of errors.
pub struct ResilientBuilder<B> {
    inner: B,
}

impl<B: DatasetBuilder> ResilientBuilder<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

impl<B: DatasetBuilder> DatasetBuilder for ResilientBuilder<B> {
    async fn build(&self, request: BuildRequest) -> Result<Dataset, ForecastError> {
        match self.inner.build(request).await {
            Ok(dataset) => Ok(dataset),
            Err(e) => {
                warn!(
                    "Forecast pipeline failed for {}, serving demo data: {}",
                    request.day_key, e
                );
                Ok(demo_dataset(request.day_key, e.to_string()))
            }
        }
    }
}

/// Three capitals over five days with fixed humidity values covering most classes.
pub fn demo_dataset(day_key: DayKey, reason: String) -> Dataset {
    const VALUES: [f64; 5] = [55.0, 35.0, 18.0, 62.0, 28.0];
    let capitals = [
        ("5300108", "Brasília", "DF", -15.78, -47.93),
        ("3550308", "São Paulo", "SP", -23.55, -46.63),
        ("3304557", "Rio de Janeiro", "RJ", -22.90, -43.17),
    ];

    let rows = capitals
        .iter()
        .map(|&(code, name, state, latitude, longitude)| Municipality {
            code: code.to_string(),
            name: name.to_string(),
            state: state.to_string(),
            latitude,
            longitude,
        })
        .flat_map(|municipality| {
            day_key
                .window(VALUES.len())
                .into_iter()
                .zip(VALUES)
                .map(move |(date, rh)| {
                    ForecastRow::for_municipality(&municipality, date, Some(rh), None)
                })
        })
        .collect();

    info!("Built demo dataset for {}", day_key);
    Dataset::new(day_key, Utc::now(), DataSource::Demo { reason }, rows)
}
