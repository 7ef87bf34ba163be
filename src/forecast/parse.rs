//! Interprets INMET forecast responses into a `date -> RHmin` map.
//!
//! Known shapes:
//!
//! ```text
//! { "<ibge>": { "20/08/2024": { "manha": { "umidade_min": 30, ... }, "tarde": {...} }, ... } }
//! { "2024-08-20": { "umidade_min": 28, ... }, ... }
//! ```
//!
//! Day keys may be `YYYY-MM-DD`, `DD/MM/YYYY` or an ISO datetime. Keys that are not dates
//! are skipped.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const MIN_HUMIDITY_KEYS: [&str; 5] = ["umidade_min", "ur_min", "umi_min", "umidadeMin", "UR_min"];

/// Parses one municipality's response.
///
/// A day whose minimum cannot be found maps to `None` rather than being skipped, so the
/// caller can tell "feed had the day without humidity" from "feed lacked the day".
pub fn parse_inmet_response(ibge: &str, body: &Value) -> BTreeMap<NaiveDate, Option<f64>> {
    let days = match body.get(ibge) {
        Some(Value::Object(inner)) => inner,
        _ => match body {
            Value::Object(map) => map,
            _ => return BTreeMap::new(),
        },
    };

    days.iter()
        .filter_map(|(key, day)| parse_day_key(key).map(|date| (date, day_minimum(day))))
        .collect()
}

pub(crate) fn parse_day_key(key: &str) -> Option<NaiveDate> {
    let key = key.trim();
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(key, "%d/%m/%Y"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(key, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(key).ok().map(|dt| dt.date_naive()))
}

fn day_minimum(day: &Value) -> Option<f64> {
    let Value::Object(fields) = day else {
        return None;
    };

    if let Some(value) = direct_minimum(fields) {
        return Some(value);
    }

    // Days split into periods (manha/tarde/noite) carry the keys one level down.
    let period_minimum = fields
        .values()
        .filter_map(|v| v.as_object())
        .filter_map(direct_minimum)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));
    if period_minimum.is_some() {
        return period_minimum;
    }

    // Hourly series: the minimum of the first list holding numbers.
    fields
        .values()
        .filter_map(|v| v.as_array())
        .filter(|list| !list.is_empty())
        .find_map(|list| {
            list.iter()
                .filter_map(numeric)
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
        })
}

fn direct_minimum(fields: &Map<String, Value>) -> Option<f64> {
    MIN_HUMIDITY_KEYS
        .iter()
        .filter_map(|key| fields.get(*key))
        .find_map(numeric)
}

fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}
