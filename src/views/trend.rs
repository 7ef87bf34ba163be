//! The five-day bar chart and summary cards for one municipality.

use crate::types::classification::{ClassThresholds, HumidityClass, UNCLASSIFIED_COLOR};
use crate::types::dataset::Dataset;
use crate::types::forecast_row::ForecastRow;
use crate::views::{day_label, percent_label};
use chrono::NaiveDate;
use serde::Serialize;

/// How many of the most recent dates the chart and cards show.
pub const TREND_DAYS: usize = 5;
/// The y axis never ends below this value.
const MIN_Y_AXIS_TOP: f64 = 40.0;
/// Headroom above the tallest bar, for its text label.
const Y_AXIS_HEADROOM: f64 = 5.0;
const DARK_TEXT: &str = "#0b0b0b";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendBar {
    pub date: NaiveDate,
    pub day: String,
    pub value: Option<f64>,
    pub text: String,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendChart {
    pub code: String,
    pub title: String,
    pub y_axis_title: &'static str,
    pub y_range: [f64; 2],
    pub bars: Vec<TrendBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCard {
    pub date: NaiveDate,
    pub day: String,
    pub value: Option<f64>,
    pub text: String,
    pub class: Option<HumidityClass>,
    pub class_label: Option<&'static str>,
    pub background: &'static str,
    pub text_color: &'static str,
}

/// The last [`TREND_DAYS`] rows of `code`, oldest first.
fn trend_rows<'a>(dataset: &'a Dataset, code: &str) -> Vec<&'a ForecastRow> {
    let rows = dataset.rows_for(code);
    let skip = rows.len().saturating_sub(TREND_DAYS);
    rows.into_iter().skip(skip).collect()
}

fn value_text(value: Option<f64>) -> String {
    value.map(percent_label).unwrap_or_else(|| "–".to_string())
}

/// Bar chart of the municipality's last five days, or `None` for an unknown code.
pub fn trend_view(
    dataset: &Dataset,
    code: &str,
    thresholds: &ClassThresholds,
) -> Option<TrendChart> {
    let rows = trend_rows(dataset, code);
    let first = rows.first()?;

    let tallest = rows
        .iter()
        .filter_map(|r| r.rh_min)
        .fold(0.0_f64, f64::max);
    let bars = rows
        .iter()
        .map(|row| TrendBar {
            date: row.date,
            day: day_label(row.date),
            value: row.rh_min,
            text: value_text(row.rh_min),
            color: thresholds
                .classify(row.rh_min)
                .map_or(UNCLASSIFIED_COLOR, |c| c.color()),
        })
        .collect();

    Some(TrendChart {
        code: first.code.clone(),
        title: format!("UR mínima – {}", first.display_name()),
        y_axis_title: "UR (%)",
        y_range: [0.0, MIN_Y_AXIS_TOP.max(tallest + Y_AXIS_HEADROOM)],
        bars,
    })
}

/// One card per trend day. Empty for an unknown code.
pub fn cards_view(dataset: &Dataset, code: &str, thresholds: &ClassThresholds) -> Vec<SummaryCard> {
    trend_rows(dataset, code)
        .into_iter()
        .map(|row| {
            let class = thresholds.classify(row.rh_min);
            SummaryCard {
                date: row.date,
                day: day_label(row.date),
                value: row.rh_min,
                text: value_text(row.rh_min),
                class,
                class_label: class.map(|c| c.label()),
                background: class.map_or(UNCLASSIFIED_COLOR, |c| c.color()),
                text_color: class.map_or(DARK_TEXT, |c| c.text_color()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dataset::DataSource;
    use crate::types::day_key::DayKey;
    use chrono::Utc;

    fn dataset(values: &[Option<f64>]) -> Dataset {
        let key = DayKey::new(NaiveDate::from_ymd_opt(2024, 8, 18).unwrap());
        let rows = key
            .window(values.len())
            .into_iter()
            .zip(values)
            .map(|(date, &rh_min)| ForecastRow {
                code: "5300108".to_string(),
                name: "Brasília".to_string(),
                state: "DF".to_string(),
                latitude: -15.78,
                longitude: -47.93,
                date,
                rh_min,
                rh_max: None,
            })
            .collect();
        Dataset::new(key, Utc::now(), DataSource::Inmet, rows)
    }

    #[test]
    fn test_trend_keeps_last_five_days() {
        let ds = dataset(&[Some(90.0), Some(55.0), Some(35.0), Some(18.0), Some(62.0), Some(28.0)]);
        let chart = trend_view(&ds, "5300108", &ClassThresholds::default()).unwrap();

        assert_eq!(chart.title, "UR mínima – Brasília / DF");
        let days: Vec<&str> = chart.bars.iter().map(|b| b.day.as_str()).collect();
        assert_eq!(days, ["19/08", "20/08", "21/08", "22/08", "23/08"]);
        assert_eq!(chart.bars[0].text, "55%");
        assert_eq!(chart.bars[2].color, "#F87171");
        assert_eq!(chart.y_range, [0.0, 67.0]);
    }

    #[test]
    fn test_trend_y_axis_floor_and_missing_values() {
        let ds = dataset(&[Some(10.0), None]);
        let chart = trend_view(&ds, "5300108", &ClassThresholds::default()).unwrap();
        assert_eq!(chart.y_range, [0.0, 40.0]);
        assert_eq!(chart.bars[1].text, "–");
        assert_eq!(chart.bars[1].color, UNCLASSIFIED_COLOR);
    }

    #[test]
    fn test_unknown_code() {
        let ds = dataset(&[Some(10.0)]);
        assert!(trend_view(&ds, "3550308", &ClassThresholds::default()).is_none());
        assert!(cards_view(&ds, "3550308", &ClassThresholds::default()).is_empty());
    }

    #[test]
    fn test_cards_colours() {
        let ds = dataset(&[Some(45.0), Some(8.0), None]);
        let cards = cards_view(&ds, "5300108", &ClassThresholds::default());

        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].class_label, Some("Quase ideal (41–60%)"));
        assert_eq!(cards[0].text_color, "#0b0b0b");
        assert_eq!(cards[1].text, "8%");
        assert_eq!(cards[1].background, "#B91C1C");
        assert_eq!(cards[1].text_color, "white");
        assert_eq!(cards[2].background, UNCLASSIFIED_COLOR);
        assert_eq!(cards[2].class, None);
    }
}
