use crate::types::dataset::{Dataset, MunicipalityOption};
use serde::Serialize;

/// Municipality dropdown contents for a set of states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityOptions {
    pub options: Vec<MunicipalityOption>,
    /// Initially selected code: Brasília when listed, otherwise the first option.
    pub selected: Option<String>,
}

pub fn municipality_options(dataset: &Dataset, states: &[String]) -> MunicipalityOptions {
    let options = dataset.municipalities(states);
    let selected = if states.is_empty() {
        dataset.default_municipality().map(str::to_string)
    } else {
        options
            .iter()
            .find(|o| o.label.to_lowercase().starts_with("brasília /"))
            .or_else(|| options.first())
            .map(|o| o.code.clone())
    };
    MunicipalityOptions { options, selected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dataset::DataSource;
    use crate::types::day_key::DayKey;
    use crate::types::forecast_row::ForecastRow;
    use chrono::{NaiveDate, Utc};

    fn dataset() -> Dataset {
        let date = NaiveDate::from_ymd_opt(2024, 8, 20).unwrap();
        let rows = [
            ("3550308", "São Paulo", "SP"),
            ("3509502", "Campinas", "SP"),
            ("3304557", "Rio de Janeiro", "RJ"),
            ("5300108", "Brasília", "DF"),
        ]
        .into_iter()
        .map(|(code, name, state)| ForecastRow {
            code: code.to_string(),
            name: name.to_string(),
            state: state.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            date,
            rh_min: Some(30.0),
            rh_max: None,
        })
        .collect();
        Dataset::new(DayKey::new(date), Utc::now(), DataSource::Inmet, rows)
    }

    #[test]
    fn test_all_states_defaults_to_brasilia() {
        let result = municipality_options(&dataset(), &[]);
        let labels: Vec<&str> = result.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(
            labels,
            [
                "Brasília / DF",
                "Rio de Janeiro / RJ",
                "Campinas / SP",
                "São Paulo / SP"
            ]
        );
        assert_eq!(result.selected.as_deref(), Some("5300108"));
    }

    #[test]
    fn test_state_filter_picks_first_option() {
        let result = municipality_options(&dataset(), &["SP".to_string()]);
        assert_eq!(result.options.len(), 2);
        assert_eq!(result.selected.as_deref(), Some("3509502"));
    }
}
