//! Process-wide store of the most recently built dataset, keyed by day.

use crate::forecast::builder::{BuildRequest, DatasetBuilder};
use crate::forecast::error::ForecastError;
use crate::types::dataset::Dataset;
use crate::types::day_key::{Clock, DayKey};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};

struct CacheEntry {
    day_key: DayKey,
    dataset: Arc<Dataset>,
}

/// Build-or-reuse cache keyed by the current [`DayKey`].
///
/// The entry mutex is held while a build runs, so concurrent first requests of a day
/// wait for the single in-flight build and then share its result: at most one build
/// runs per day key. A failed build stores nothing.
pub struct DailyCache<B, C> {
    builder: B,
    clock: C,
    entry: Mutex<Option<CacheEntry>>,
}

impl<B: DatasetBuilder, C: Clock> DailyCache<B, C> {
    pub fn new(builder: B, clock: C) -> Self {
        Self {
            builder,
            clock,
            entry: Mutex::new(None),
        }
    }

    /// The key for "now" according to the cache's clock.
    pub fn day_key(&self) -> DayKey {
        self.clock.day_key()
    }

    /// Returns today's dataset, building it on the first request of the day.
    ///
    /// The day key is read after the lock is taken, so a request that waited behind
    /// a build sees the clock as of when it runs.
    pub async fn get(&self) -> Result<Arc<Dataset>, ForecastError> {
        let mut entry = self.entry.lock().await;
        let day_key = self.day_key();
        self.get_or_build_locked(&mut entry, day_key).await
    }

    /// Returns the dataset cached for `day_key`, or builds, stores and returns a new one.
    ///
    /// Day keys never go backwards: when the cached dataset is for a later day than
    /// `day_key`, that dataset is returned as is.
    pub async fn get_or_build(&self, day_key: DayKey) -> Result<Arc<Dataset>, ForecastError> {
        let mut entry = self.entry.lock().await;
        self.get_or_build_locked(&mut entry, day_key).await
    }

    /// Rebuilds today's dataset even if one is cached, bypassing any reusable
    /// intermediate results of the builder.
    pub async fn refresh(&self) -> Result<Arc<Dataset>, ForecastError> {
        let mut entry = self.entry.lock().await;
        let day_key = match entry.as_ref() {
            Some(cached) => cached.day_key.max(self.day_key()),
            None => self.day_key(),
        };
        info!("Forced rebuild for day key {}", day_key);
        let dataset = self.build_locked(BuildRequest::forced(day_key)).await?;
        *entry = Some(CacheEntry {
            day_key,
            dataset: Arc::clone(&dataset),
        });
        Ok(dataset)
    }

    /// The cached dataset, whatever its day, without building.
    pub async fn current(&self) -> Option<Arc<Dataset>> {
        self.entry
            .lock()
            .await
            .as_ref()
            .map(|cached| Arc::clone(&cached.dataset))
    }

    async fn get_or_build_locked(
        &self,
        entry: &mut MutexGuard<'_, Option<CacheEntry>>,
        day_key: DayKey,
    ) -> Result<Arc<Dataset>, ForecastError> {
        if let Some(cached) = &**entry {
            if cached.day_key >= day_key {
                return Ok(Arc::clone(&cached.dataset));
            }
        }

        info!("(Re)building dataset for day key {}", day_key);
        let dataset = self.build_locked(BuildRequest::new(day_key)).await?;
        **entry = Some(CacheEntry {
            day_key,
            dataset: Arc::clone(&dataset),
        });
        Ok(dataset)
    }

    async fn build_locked(&self, request: BuildRequest) -> Result<Arc<Dataset>, ForecastError> {
        let started = Instant::now();
        match self.builder.build(request).await {
            Ok(dataset) => {
                info!(
                    "Built {} rows ({} with RHmin) for {} in {:?}",
                    dataset.len(),
                    dataset.rh_min_count(),
                    request.day_key,
                    started.elapsed()
                );
                Ok(Arc::new(dataset))
            }
            Err(e) => {
                warn!("Dataset build failed for {}: {}", request.day_key, e);
                Err(e)
            }
        }
    }
}
