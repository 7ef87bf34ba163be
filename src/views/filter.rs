use crate::types::dataset::Dataset;
use crate::types::forecast_row::ForecastRow;
use crate::utils::normalize_code;
use crate::views::day_label;
use chrono::NaiveDate;
use serde::Serialize;

/// The panel's shared filter controls: states, one municipality and a date slider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelFilter {
    /// Upper-cased state abbreviations. Empty means every state.
    pub states: Vec<String>,
    /// Normalised municipality code. `None` means every municipality.
    pub municipality: Option<String>,
    /// Index into the dataset's dates. `None` selects the last date.
    pub date_index: Option<usize>,
}

impl PanelFilter {
    /// Builds a filter from raw query values (`uf=SP,RJ`, `municipality=3550308`, `date=2`).
    ///
    /// Blank values are ignored; an unparsable date index falls back to the default.
    pub fn from_query(states: Option<&str>, municipality: Option<&str>, date: Option<&str>) -> Self {
        Self {
            states: states.map(parse_states).unwrap_or_default(),
            municipality: municipality.and_then(normalize_code),
            date_index: date.and_then(|d| d.trim().parse().ok()),
        }
    }

    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.states = states
            .into_iter()
            .map(|s| s.as_ref().trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn with_municipality(mut self, code: &str) -> Self {
        self.municipality = normalize_code(code);
        self
    }

    pub fn with_date_index(mut self, index: usize) -> Self {
        self.date_index = Some(index);
        self
    }

    /// The date picked by `date_index` among `dates`; indices past the end clamp to the
    /// last date.
    pub fn select_date(&self, dates: &[NaiveDate]) -> Option<NaiveDate> {
        let last = dates.len().checked_sub(1)?;
        let index = self.date_index.map_or(last, |i| i.min(last));
        dates.get(index).copied()
    }

    /// State and municipality filters (the date is applied separately).
    pub fn matches(&self, row: &ForecastRow) -> bool {
        let state_ok = self.states.is_empty() || self.states.contains(&row.state);
        let municipality_ok = self
            .municipality
            .as_ref()
            .is_none_or(|code| *code == row.code);
        state_ok && municipality_ok
    }

    /// Rows of the selected date passing the state and municipality filters, plus that date.
    pub fn apply<'a>(&self, dataset: &'a Dataset) -> (Option<NaiveDate>, Vec<&'a ForecastRow>) {
        let selected = self.select_date(&dataset.dates());
        let rows = dataset
            .rows()
            .iter()
            .filter(|row| Some(row.date) == selected)
            .filter(|row| self.matches(row))
            .collect();
        (selected, rows)
    }
}

/// Splits a comma separated state list (`"sp, rj"` -> `["SP", "RJ"]`).
pub fn parse_states(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// The date slider's marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateOptions {
    pub dates: Vec<NaiveDate>,
    pub labels: Vec<String>,
    pub default_index: Option<usize>,
}

pub fn date_options(dataset: &Dataset) -> DateOptions {
    let dates = dataset.dates();
    DateOptions {
        labels: dates.iter().copied().map(day_label).collect(),
        default_index: dates.len().checked_sub(1),
        dates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dataset::DataSource;
    use crate::types::day_key::DayKey;
    use chrono::Utc;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, day).unwrap()
    }

    fn row(code: &str, state: &str, day: u32) -> ForecastRow {
        ForecastRow {
            code: code.to_string(),
            name: format!("M{}", code),
            state: state.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            date: date(day),
            rh_min: Some(30.0),
            rh_max: None,
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            DayKey::new(date(20)),
            Utc::now(),
            DataSource::Inmet,
            vec![
                row("3550308", "SP", 20),
                row("3550308", "SP", 21),
                row("3304557", "RJ", 20),
                row("3304557", "RJ", 21),
                row("5300108", "DF", 21),
            ],
        )
    }

    #[test]
    fn test_select_date_defaults_to_last_and_clamps() {
        let dates = [date(20), date(21), date(22)];
        assert_eq!(PanelFilter::default().select_date(&dates), Some(date(22)));
        assert_eq!(
            PanelFilter::default().with_date_index(0).select_date(&dates),
            Some(date(20))
        );
        assert_eq!(
            PanelFilter::default().with_date_index(9).select_date(&dates),
            Some(date(22))
        );
        assert_eq!(PanelFilter::default().select_date(&[]), None);
    }

    #[test]
    fn test_from_query() {
        let filter = PanelFilter::from_query(Some("sp, rj,"), Some("3550308.0"), Some(" 1 "));
        assert_eq!(filter.states, ["SP", "RJ"]);
        assert_eq!(filter.municipality.as_deref(), Some("3550308"));
        assert_eq!(filter.date_index, Some(1));

        let blank = PanelFilter::from_query(Some(""), Some(""), Some("x"));
        assert_eq!(blank, PanelFilter::default());
    }

    #[test]
    fn test_apply_filters_by_state_municipality_and_date() {
        let ds = dataset();

        let (selected, rows) = PanelFilter::default().apply(&ds);
        assert_eq!(selected, Some(date(21)));
        assert_eq!(rows.len(), 3);

        let (_, rows) = PanelFilter::default()
            .with_states(["sp", "RJ"])
            .with_date_index(0)
            .apply(&ds);
        let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["3304557", "3550308"]);

        let (_, rows) = PanelFilter::default().with_municipality("5300108").apply(&ds);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state, "DF");
    }

    #[test]
    fn test_date_options() {
        let options = date_options(&dataset());
        assert_eq!(options.labels, ["20/08", "21/08"]);
        assert_eq!(options.default_index, Some(1));
    }
}
