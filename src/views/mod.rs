//! Read-only renderings of a [`Dataset`](crate::types::dataset::Dataset): map, trend
//! chart, summary cards, class listing and the selection helpers that feed them.

pub mod boundaries;
pub mod class_list;
pub mod error;
pub mod filter;
pub mod map;
pub mod selection;
pub mod trend;

use chrono::NaiveDate;

/// `DD/MM`, the day label used across charts, cards and listings.
pub fn day_label(date: NaiveDate) -> String {
    date.format("%d/%m").to_string()
}

/// A humidity value rounded to the unit, e.g. `"27%"`.
pub fn percent_label(value: f64) -> String {
    format!("{:.0}%", value)
}
