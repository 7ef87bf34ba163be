use crate::types::classification::{ClassThresholds, HumidityClass};
use crate::types::dataset::Dataset;
use crate::views::filter::PanelFilter;
use crate::views::{day_label, percent_label};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

pub const EMPTY_HEADER: &str = "0 município(s) na categoria selecionada.";
pub const EMPTY_BODY: &str = "Nenhum município com os filtros atuais.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassListEntry {
    pub code: String,
    pub name: String,
    pub state: String,
    pub rh_min: f64,
    pub line: String,
}

/// Municipalities of one class on the selected date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassList {
    pub class: HumidityClass,
    pub date: Option<NaiveDate>,
    pub count: usize,
    pub header: String,
    /// Markdown bullet list, or the empty-result message.
    pub body: String,
    pub entries: Vec<ClassListEntry>,
}

/// Lists the filtered municipalities whose RHmin falls in `class` on the selected date,
/// one entry per municipality, sorted by state then name.
pub fn class_list_view(
    dataset: &Dataset,
    filter: &PanelFilter,
    class: HumidityClass,
    thresholds: &ClassThresholds,
) -> ClassList {
    let (date, rows) = filter.apply(dataset);
    let mut seen = HashSet::new();
    let mut entries: Vec<ClassListEntry> = rows
        .into_iter()
        .filter(|row| thresholds.classify(row.rh_min) == Some(class))
        .filter(|row| seen.insert(row.code.as_str()))
        .filter_map(|row| {
            let rh_min = row.rh_min?;
            Some(ClassListEntry {
                line: format!(
                    "- {} / {} — {}",
                    row.name,
                    row.state,
                    percent_label(rh_min)
                ),
                code: row.code.clone(),
                name: row.name.clone(),
                state: row.state.clone(),
                rh_min,
            })
        })
        .collect();
    entries.sort_by(|a, b| a.state.cmp(&b.state).then_with(|| a.name.cmp(&b.name)));

    if entries.is_empty() {
        return ClassList {
            class,
            date,
            count: 0,
            header: EMPTY_HEADER.to_string(),
            body: EMPTY_BODY.to_string(),
            entries,
        };
    }

    let day = date.map(day_label).unwrap_or_default();
    ClassList {
        class,
        date,
        count: entries.len(),
        header: format!(
            "{} município(s) na categoria: {} – {}",
            entries.len(),
            class.label(),
            day
        ),
        body: entries
            .iter()
            .map(|e| e.line.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dataset::DataSource;
    use crate::types::day_key::DayKey;
    use crate::types::forecast_row::ForecastRow;
    use chrono::Utc;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, day).unwrap()
    }

    fn row(code: &str, name: &str, state: &str, day: u32, rh_min: Option<f64>) -> ForecastRow {
        ForecastRow {
            code: code.to_string(),
            name: name.to_string(),
            state: state.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            date: date(day),
            rh_min,
            rh_max: None,
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            DayKey::new(date(20)),
            Utc::now(),
            DataSource::Inmet,
            vec![
                row("3550308", "São Paulo", "SP", 20, Some(25.0)),
                row("3509502", "Campinas", "SP", 20, Some(22.0)),
                row("3304557", "Rio de Janeiro", "RJ", 20, Some(28.4)),
                row("5300108", "Brasília", "DF", 20, Some(15.0)),
                row("5208707", "Goiânia", "GO", 20, None),
                row("3550308", "São Paulo", "SP", 21, Some(50.0)),
            ],
        )
    }

    #[test]
    fn test_lists_class_sorted_by_state_then_name() {
        let filter = PanelFilter::default().with_date_index(0);
        let list = class_list_view(
            &dataset(),
            &filter,
            HumidityClass::Attention,
            &ClassThresholds::default(),
        );

        assert_eq!(list.count, 3);
        assert_eq!(
            list.header,
            "3 município(s) na categoria: Atenção (20–29%) – 20/08"
        );
        assert_eq!(
            list.body,
            "- Rio de Janeiro / RJ — 28%\n- Campinas / SP — 22%\n- São Paulo / SP — 25%"
        );
    }

    #[test]
    fn test_state_filter_narrows_list() {
        let filter = PanelFilter::default().with_states(["RJ"]).with_date_index(0);
        let list = class_list_view(
            &dataset(),
            &filter,
            HumidityClass::Attention,
            &ClassThresholds::default(),
        );
        assert_eq!(list.count, 1);
        assert_eq!(list.entries[0].code, "3304557");
    }

    #[test]
    fn test_empty_result_messages() {
        let list = class_list_view(
            &dataset(),
            &PanelFilter::default(),
            HumidityClass::Emergency,
            &ClassThresholds::default(),
        );
        assert_eq!(list.count, 0);
        assert_eq!(list.header, EMPTY_HEADER);
        assert_eq!(list.body, EMPTY_BODY);
        assert_eq!(list.date, Some(date(21)));
    }
}
