//! Day keys bucket cache validity by calendar day in the fixed `America/Sao_Paulo` zone.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The zone every day key is computed in (Brasília time).
pub const PANEL_TIME_ZONE: Tz = chrono_tz::America::Sao_Paulo;

/// A date-only cache key derived from the current instant in [`PANEL_TIME_ZONE`].
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use inmet_humidity::DayKey;
///
/// // 02:30 UTC is still the previous evening in São Paulo (UTC-3).
/// let instant = Utc.with_ymd_and_hms(2024, 8, 21, 2, 30, 0).unwrap();
/// assert_eq!(DayKey::from_instant(instant).to_string(), "2024-08-20");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Computes the key for a UTC instant.
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self(instant.with_timezone(&PANEL_TIME_ZONE).date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The `count` consecutive dates starting at this key (the forecast window).
    pub fn window(&self, count: usize) -> Vec<NaiveDate> {
        (0..count as u64)
            .filter_map(|offset| self.0.checked_add_days(Days::new(offset)))
            .collect()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Source of the current instant.
///
/// The cache asks its clock for "now" on every request, so tests can move time across
/// local midnight without waiting for it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn day_key(&self) -> DayKey {
        DayKey::from_instant(self.now())
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
