//! The main entry point: a daily-cached dataset plus the views rendered from it.

use crate::cache::daily_cache::DailyCache;
use crate::error::PanelError;
use crate::forecast::builder::{DatasetBuilder, InmetDatasetBuilder, ResilientBuilder};
use crate::forecast::inmet::InmetClient;
use crate::forecast::snapshot::SnapshotStore;
use crate::settings::Settings;
use crate::types::classification::{ClassThresholds, HumidityClass};
use crate::types::dataset::{DataSource, Dataset};
use crate::types::day_key::{Clock, DayKey, SystemClock};
use crate::views::boundaries::BoundaryIndex;
use crate::views::class_list::{class_list_view, ClassList};
use crate::views::filter::{date_options, DateOptions, PanelFilter};
use crate::views::map::{map_view, MapView};
use crate::views::selection::{municipality_options, MunicipalityOptions};
use crate::views::trend::{cards_view, trend_view, SummaryCard, TrendChart};
use bon::bon;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

/// The panel as deployed: INMET-backed, falling back to demo data, on wall-clock time.
pub type InmetPanel = HumidityPanel<ResilientBuilder<InmetDatasetBuilder>, SystemClock>;

/// Summary of the dataset currently served.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelStatus {
    pub day_key: DayKey,
    pub built_at: DateTime<Utc>,
    pub source: DataSource,
    pub degraded: bool,
    pub rows: usize,
    pub rows_with_rh_min: usize,
    pub dates: usize,
    pub municipalities: usize,
}

/// Chart and cards for one municipality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityTrend {
    pub chart: TrendChart,
    pub cards: Vec<SummaryCard>,
}

/// Serves every view from the dataset of the current day.
///
/// Each call goes through the [`DailyCache`], so the first call of a day (in
/// `America/Sao_Paulo`) builds the dataset and later calls reuse it.
///
/// # Examples
///
/// ```rust,no_run
/// # use inmet_humidity::{InmetPanel, PanelError, PanelFilter, Settings};
/// # async fn run() -> Result<(), PanelError> {
/// let panel = InmetPanel::from_settings(&Settings::load()?).await?;
/// let map = panel.map(&PanelFilter::default().with_states(["SP"])).await?;
/// println!("{} municipalities on the map", map.features.len());
/// # Ok(())
/// # }
/// ```
pub struct HumidityPanel<B, C = SystemClock> {
    cache: DailyCache<B, C>,
    thresholds: ClassThresholds,
    boundaries: Option<BoundaryIndex>,
}

#[bon]
impl<B: DatasetBuilder, C: Clock> HumidityPanel<B, C> {
    /// Creates a panel around any dataset builder and clock.
    ///
    /// # Arguments
    ///
    /// * `.dataset_builder(B)`: **Required.** Produces the dataset on each day's first request.
    /// * `.clock(C)`: **Required.** Source of "now" for the day key.
    /// * `.thresholds(ClassThresholds)`: Optional. Defaults to [`ClassThresholds::default`].
    /// * `.boundaries(BoundaryIndex)`: Optional. Without it the map renders points.
    #[builder]
    pub fn new(
        dataset_builder: B,
        clock: C,
        thresholds: Option<ClassThresholds>,
        boundaries: Option<BoundaryIndex>,
    ) -> Self {
        Self {
            cache: DailyCache::new(dataset_builder, clock),
            thresholds: thresholds.unwrap_or_default(),
            boundaries,
        }
    }

    /// Today's dataset, built on the first call of the day.
    pub async fn dataset(&self) -> Result<Arc<Dataset>, PanelError> {
        Ok(self.cache.get().await?)
    }

    /// Rebuilds today's dataset, ignoring any snapshot.
    pub async fn refresh(&self) -> Result<Arc<Dataset>, PanelError> {
        Ok(self.cache.refresh().await?)
    }

    pub async fn status(&self) -> Result<PanelStatus, PanelError> {
        let dataset = self.dataset().await?;
        Ok(PanelStatus {
            day_key: dataset.day_key(),
            built_at: dataset.built_at(),
            source: dataset.source().clone(),
            degraded: dataset.is_degraded(),
            rows: dataset.len(),
            rows_with_rh_min: dataset.rh_min_count(),
            dates: dataset.dates().len(),
            municipalities: dataset.municipalities(&[]).len(),
        })
    }

    pub async fn dates(&self) -> Result<DateOptions, PanelError> {
        Ok(date_options(&*self.dataset().await?))
    }

    pub async fn states(&self) -> Result<Vec<String>, PanelError> {
        Ok(self.dataset().await?.states())
    }

    pub async fn municipalities(&self, states: &[String]) -> Result<MunicipalityOptions, PanelError> {
        Ok(municipality_options(&*self.dataset().await?, states))
    }

    pub async fn map(&self, filter: &PanelFilter) -> Result<MapView, PanelError> {
        let dataset = self.dataset().await?;
        Ok(map_view(
            &dataset,
            filter,
            &self.thresholds,
            self.boundaries.as_ref(),
        ))
    }

    /// Chart and cards for `code`, or `None` when the municipality is not in the dataset.
    pub async fn trend(&self, code: &str) -> Result<Option<MunicipalityTrend>, PanelError> {
        let dataset = self.dataset().await?;
        Ok(
            trend_view(&dataset, code, &self.thresholds).map(|chart| MunicipalityTrend {
                cards: cards_view(&dataset, code, &self.thresholds),
                chart,
            }),
        )
    }

    pub async fn class_list(
        &self,
        class: HumidityClass,
        filter: &PanelFilter,
    ) -> Result<ClassList, PanelError> {
        let dataset = self.dataset().await?;
        Ok(class_list_view(&dataset, filter, class, &self.thresholds))
    }
}

impl InmetPanel {
    /// Wires the INMET client, reference table, optional snapshots and boundaries from
    /// `settings`.
    ///
    /// A missing or unreadable boundary file only disables the choropleth.
    pub async fn from_settings(settings: &Settings) -> Result<Self, PanelError> {
        let client = InmetClient::builder()
            .url_template(settings.inmet_forecast_url_template.clone())
            .timeout(settings.request_timeout())
            .max_concurrent(settings.max_workers)
            .build()?;

        let mut builder = InmetDatasetBuilder::new(client, settings.attr_xlsx.clone())
            .with_forecast_days(settings.forecast_days);
        if let Some(limit) = settings.municipality_limit() {
            info!("Fetching only the first {} municipalities", limit);
            builder = builder.with_max_municipalities(limit);
        }
        if let Some(dir) = settings.snapshot_dir() {
            info!("Day snapshots stored in {:?}", dir);
            builder = builder.with_snapshots(SnapshotStore::new(&dir));
        }

        let boundaries = match BoundaryIndex::load(&settings.geojson_path).await {
            Ok(index) => index,
            Err(e) => {
                warn!("Boundaries unavailable, map will use points: {}", e);
                None
            }
        };

        Ok(HumidityPanel::builder()
            .dataset_builder(ResilientBuilder::new(builder))
            .clock(SystemClock)
            .thresholds(settings.classes)
            .maybe_boundaries(boundaries)
            .build())
    }
}
