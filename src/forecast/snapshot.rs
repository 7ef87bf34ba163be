//! Parquet snapshots of a day's INMET dataset, so a restart on the same day does not
//! re-fetch every municipality.

use crate::forecast::error::ForecastError;
use crate::types::dataset::{DataSource, Dataset};
use crate::types::day_key::DayKey;
use crate::types::forecast_row::ForecastRow;
use crate::utils::ensure_cache_dir_exists;
use chrono::{Duration, NaiveDate, Utc};
use log::{info, warn};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::{fs, task};

const SNAPSHOT_PREFIX: &str = "forecast-";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, day_key: DayKey) -> PathBuf {
        self.dir
            .join(format!("{}{}.parquet", SNAPSHOT_PREFIX, day_key))
    }

    /// Loads the snapshot for `day_key`, if one was written.
    pub async fn load(&self, day_key: DayKey) -> Result<Option<Dataset>, ForecastError> {
        let path = self.path_for(day_key);
        if fs::metadata(&path).await.is_err() {
            return Ok(None);
        }

        let path_clone = path.clone();
        let rows = task::spawn_blocking(move || {
            let file = std::fs::File::open(&path_clone)
                .map_err(|e| ForecastError::SnapshotIo(path_clone.clone(), e))?;
            let df = ParquetReader::new(file)
                .finish()
                .map_err(|e| ForecastError::SnapshotPolars(path_clone.clone(), e))?;
            frame_to_rows(&path_clone, &df)
        })
        .await??;

        info!(
            "Loaded {} rows for {} from snapshot {:?}",
            rows.len(),
            day_key,
            path
        );
        Ok(Some(Dataset::new(day_key, Utc::now(), DataSource::Inmet, rows)))
    }

    /// Writes `dataset` as the snapshot of its day, replacing any previous file.
    ///
    /// Snapshots of other days are deleted once the write succeeded, so the directory
    /// holds at most one day.
    pub async fn store(&self, dataset: &Dataset) -> Result<PathBuf, ForecastError> {
        ensure_cache_dir_exists(&self.dir)
            .await
            .map_err(|e| ForecastError::SnapshotDirCreation(self.dir.clone(), e))?;

        let path = self.path_for(dataset.day_key());
        let mut df = rows_to_frame(dataset.rows())
            .map_err(|e| ForecastError::SnapshotPolars(path.clone(), e))?;
        let path_buf = path.clone();
        task::spawn_blocking(move || {
            let file = std::fs::File::create(&path_buf)
                .map_err(|e| ForecastError::SnapshotIo(path_buf.clone(), e))?;
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| ForecastError::SnapshotPolars(path_buf, e))?;
            Ok::<(), ForecastError>(())
        })
        .await??;

        info!(
            "Wrote snapshot of {} rows for {} to {:?}",
            dataset.len(),
            dataset.day_key(),
            path
        );
        self.remove_all_except(&path).await;
        Ok(path)
    }

    async fn remove_all_except(&self, keep: &Path) {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list snapshot directory {:?}: {}", self.dir, e);
                return;
            }
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Could not list snapshot directory {:?}: {}", self.dir, e);
                    break;
                }
            };
            let path = entry.path();
            if path == keep || !is_snapshot_file(&path) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => info!("Removed old snapshot {:?}", path),
                Err(e) => warn!("Failed to remove old snapshot {:?}: {}", path, e),
            }
        }
    }
}

fn is_snapshot_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".parquet"))
}

/// Converts rows into a DataFrame with the panel's column names
/// (`CD_MUN, NM_MUN, SIGLA_UF, lat, lon, data, RHmin, RHmax`).
pub fn rows_to_frame(rows: &[ForecastRow]) -> PolarsResult<DataFrame> {
    let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    let states: Vec<&str> = rows.iter().map(|r| r.state.as_str()).collect();
    let lats: Vec<f64> = rows.iter().map(|r| r.latitude).collect();
    let lons: Vec<f64> = rows.iter().map(|r| r.longitude).collect();
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    let rh_min: Vec<Option<f64>> = rows.iter().map(|r| r.rh_min).collect();
    let rh_max: Vec<Option<f64>> = rows.iter().map(|r| r.rh_max).collect();

    DataFrame::new(vec![
        Column::new("CD_MUN".into(), codes),
        Column::new("NM_MUN".into(), names),
        Column::new("SIGLA_UF".into(), states),
        Column::new("lat".into(), lats),
        Column::new("lon".into(), lons),
        Column::new("data".into(), dates),
        Column::new("RHmin".into(), rh_min),
        Column::new("RHmax".into(), rh_max),
    ])
}

fn frame_to_rows(path: &Path, df: &DataFrame) -> Result<Vec<ForecastRow>, ForecastError> {
    let column = |name: &str| {
        df.column(name).map_err(|e| ForecastError::SnapshotColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
            source: e,
        })
    };
    let typed_error = |name: &str| {
        let path = path.to_path_buf();
        let name = name.to_string();
        move |e: PolarsError| ForecastError::SnapshotColumn {
            path,
            column: name,
            source: e,
        }
    };

    let codes = column("CD_MUN")?.str().map_err(typed_error("CD_MUN"))?;
    let names = column("NM_MUN")?.str().map_err(typed_error("NM_MUN"))?;
    let states = column("SIGLA_UF")?.str().map_err(typed_error("SIGLA_UF"))?;
    let lats = column("lat")?.f64().map_err(typed_error("lat"))?;
    let lons = column("lon")?.f64().map_err(typed_error("lon"))?;
    let dates = column("data")?.date().map_err(typed_error("data"))?;
    let rh_min = column("RHmin")?.f64().map_err(typed_error("RHmin"))?;
    let rh_max = column("RHmax")?.f64().map_err(typed_error("RHmax"))?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let rows = (0..df.height())
        .filter_map(|i| {
            let days_since_epoch = dates.get(i)?;
            Some(ForecastRow {
                code: codes.get(i)?.to_string(),
                name: names.get(i).unwrap_or_default().to_string(),
                state: states.get(i).unwrap_or_default().to_string(),
                latitude: lats.get(i)?,
                longitude: lons.get(i)?,
                date: epoch + Duration::days(days_since_epoch as i64),
                rh_min: rh_min.get(i),
                rh_max: rh_max.get(i),
            })
        })
        .collect();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset(day_key: DayKey) -> Dataset {
        let rows = day_key
            .window(3)
            .into_iter()
            .enumerate()
            .map(|(i, date)| ForecastRow {
                code: "5300108".to_string(),
                name: "Brasília".to_string(),
                state: "DF".to_string(),
                latitude: -15.78,
                longitude: -47.93,
                date,
                rh_min: if i == 1 { None } else { Some(20.0 + i as f64) },
                rh_max: None,
            })
            .collect();
        Dataset::new(day_key, Utc::now(), DataSource::Inmet, rows)
    }

    #[tokio::test]
    async fn test_store_then_load_same_day() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let store = SnapshotStore::new(&tmp.path().join("snapshots"));
        let day_key = DayKey::new(NaiveDate::from_ymd_opt(2024, 8, 20).unwrap());
        let dataset = sample_dataset(day_key);

        let path = store.store(&dataset).await?;
        assert!(path.ends_with("forecast-2024-08-20.parquet"));

        let loaded = store.load(day_key).await?.expect("snapshot should exist");
        assert_eq!(loaded.rows(), dataset.rows());
        assert_eq!(loaded.source(), &DataSource::Inmet);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_other_day_is_none() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let store = SnapshotStore::new(tmp.path());
        let day_key = DayKey::new(NaiveDate::from_ymd_opt(2024, 8, 20).unwrap());
        store.store(&sample_dataset(day_key)).await?;

        let next_day = DayKey::new(NaiveDate::from_ymd_opt(2024, 8, 21).unwrap());
        assert!(store.load(next_day).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_store_keeps_only_latest_day() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        std::fs::write(tmp.path().join("notes.txt"), "kept")?;
        let store = SnapshotStore::new(tmp.path());

        let first = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        for offset in 0..10 {
            let day_key = DayKey::new(first + Duration::days(offset));
            store.store(&sample_dataset(day_key)).await?;
        }

        let mut names: Vec<String> = std::fs::read_dir(tmp.path())?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<_, _>>()?;
        names.sort();
        assert_eq!(names, ["forecast-2024-08-10.parquet", "notes.txt"]);

        let last = DayKey::new(NaiveDate::from_ymd_opt(2024, 8, 10).unwrap());
        assert!(store.load(last).await?.is_some());
        assert!(store.load(DayKey::new(first)).await?.is_none());
        Ok(())
    }

    #[test]
    fn test_rows_to_frame_schema() -> Result<(), PolarsError> {
        let day_key = DayKey::new(NaiveDate::from_ymd_opt(2024, 8, 20).unwrap());
        let df = rows_to_frame(sample_dataset(day_key).rows())?;
        assert_eq!(df.shape(), (3, 8));
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            ["CD_MUN", "NM_MUN", "SIGLA_UF", "lat", "lon", "data", "RHmin", "RHmax"]
        );
        assert_eq!(df.column("data")?.dtype(), &DataType::Date);
        assert_eq!(df.column("RHmin")?.null_count(), 1);
        Ok(())
    }
}
