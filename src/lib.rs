mod cache;
mod error;
mod forecast;
mod municipalities;
mod panel;
mod server;
mod settings;
mod types;
mod utils;
mod views;

pub use error::PanelError;
pub use panel::{HumidityPanel, InmetPanel, MunicipalityTrend, PanelStatus};
pub use server::{routes, RefreshQuery, ViewQuery};
pub use settings::{Settings, SettingsError};

pub use cache::daily_cache::DailyCache;

pub use forecast::builder::{
    demo_dataset, join_forecasts, BuildRequest, DatasetBuilder, InmetDatasetBuilder,
    ResilientBuilder,
};
pub use forecast::error::ForecastError;
pub use forecast::inmet::{DayMap, InmetClient, DEFAULT_URL_TEMPLATE};
pub use forecast::parse::parse_inmet_response;
pub use forecast::snapshot::{rows_to_frame, SnapshotStore};

pub use municipalities::error::MunicipalityTableError;
pub use municipalities::table::MunicipalityTable;

pub use types::classification::{ClassThresholds, HumidityClass, UnknownClassError, UNCLASSIFIED_COLOR};
pub use types::dataset::{DataSource, Dataset, MunicipalityOption};
pub use types::day_key::{Clock, DayKey, SystemClock, PANEL_TIME_ZONE};
pub use types::forecast_row::{ForecastRow, Municipality};

pub use views::boundaries::BoundaryIndex;
pub use views::class_list::{class_list_view, ClassList, ClassListEntry};
pub use views::error::BoundaryError;
pub use views::filter::{date_options, parse_states, DateOptions, PanelFilter};
pub use views::map::{legend, map_view, Feature, FeatureProperties, LegendEntry, MapCenter, MapView};
pub use views::selection::{municipality_options, MunicipalityOptions};
pub use views::trend::{cards_view, trend_view, SummaryCard, TrendBar, TrendChart};
pub use views::{day_label, percent_label};
