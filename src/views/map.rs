use crate::types::classification::{ClassThresholds, HumidityClass, UNCLASSIFIED_COLOR};
use crate::types::dataset::Dataset;
use crate::types::forecast_row::ForecastRow;
use crate::views::boundaries::BoundaryIndex;
use crate::views::filter::PanelFilter;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

/// Where the map opens: the geographic centre of Brazil.
pub const MAP_CENTER: MapCenter = MapCenter {
    lat: -14.2,
    lon: -51.9,
};
pub const LEGEND_TITLE: &str = "Classificação (UR mínima)";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub class: HumidityClass,
    pub label: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureProperties {
    #[serde(rename = "CD_MUN")]
    pub code: String,
    #[serde(rename = "NM_MUN")]
    pub name: String,
    #[serde(rename = "SIGLA_UF")]
    pub state: String,
    #[serde(rename = "RHmin")]
    pub rh_min: Option<f64>,
    pub class: Option<HumidityClass>,
    pub label: Option<&'static str>,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: Value,
    pub properties: FeatureProperties,
}

/// A GeoJSON FeatureCollection plus the legend and viewport of the choropleth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
    pub date: Option<NaiveDate>,
    /// `true` when features carry municipality polygons, `false` for points.
    pub choropleth: bool,
    pub legend_title: &'static str,
    pub legend: Vec<LegendEntry>,
    pub center: MapCenter,
}

/// Legend entries in class order.
pub fn legend() -> Vec<LegendEntry> {
    HumidityClass::ALL
        .iter()
        .map(|&class| LegendEntry {
            class,
            label: class.label(),
            color: class.color(),
        })
        .collect()
}

/// Renders the map for the filter's date, states and municipality.
///
/// With `boundaries`, each row is drawn as its municipality polygon and rows without a
/// polygon are left out, as a choropleth would; otherwise every row is a point at the
/// municipality's coordinates.
pub fn map_view(
    dataset: &Dataset,
    filter: &PanelFilter,
    thresholds: &ClassThresholds,
    boundaries: Option<&BoundaryIndex>,
) -> MapView {
    let (date, rows) = filter.apply(dataset);
    let features = rows
        .into_iter()
        .filter_map(|row| {
            let geometry = match boundaries {
                Some(index) => index.geometry(&row.code)?.clone(),
                None => point(row),
            };
            Some(feature(row, geometry, thresholds))
        })
        .collect();

    MapView {
        kind: "FeatureCollection",
        features,
        date,
        choropleth: boundaries.is_some(),
        legend_title: LEGEND_TITLE,
        legend: legend(),
        center: MAP_CENTER,
    }
}

fn point(row: &ForecastRow) -> Value {
    json!({"type": "Point", "coordinates": [row.longitude, row.latitude]})
}

fn feature(row: &ForecastRow, geometry: Value, thresholds: &ClassThresholds) -> Feature {
    let class = thresholds.classify(row.rh_min);
    Feature {
        kind: "Feature",
        geometry,
        properties: FeatureProperties {
            code: row.code.clone(),
            name: row.name.clone(),
            state: row.state.clone(),
            rh_min: row.rh_min,
            class,
            label: class.map(|c| c.label()),
            color: class.map_or(UNCLASSIFIED_COLOR, |c| c.color()),
        },
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

    fn row(code: &str, state: &str, day: u32, rh_min: Option<f64>) -> ForecastRow {
        ForecastRow {
            code: code.to_string(),
            name: format!("M{}", code),
            state: state.to_string(),
            latitude: -20.0,
            longitude: -45.0,
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
                row("3550308", "SP", 20, Some(35.0)),
                row("3550308", "SP", 21, Some(18.0)),
                row("3304557", "RJ", 21, None),
                row("5300108", "DF", 21, Some(70.0)),
            ],
        )
    }

    #[test]
    fn test_point_map_for_default_date() {
        let view = map_view(
            &dataset(),
            &PanelFilter::default(),
            &ClassThresholds::default(),
            None,
        );
        assert_eq!(view.kind, "FeatureCollection");
        assert_eq!(view.date, Some(date(21)));
        assert!(!view.choropleth);
        assert_eq!(view.features.len(), 3);

        let sp = &view.features[1].properties;
        assert_eq!(sp.code, "3550308");
        assert_eq!(sp.class, Some(HumidityClass::Alert));
        assert_eq!(sp.color, "#F87171");
        assert_eq!(
            view.features[1].geometry,
            json!({"type": "Point", "coordinates": [-45.0, -20.0]})
        );

        let rj = &view.features[0].properties;
        assert_eq!(rj.class, None);
        assert_eq!(rj.color, UNCLASSIFIED_COLOR);
    }

    #[test]
    fn test_choropleth_uses_boundaries_and_skips_unmatched() {
        let polygon = json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]});
        let index = BoundaryIndex::from_geojson(&json!({
            "features": [{"properties": {"CD_MUN": "5300108"}, "geometry": polygon.clone()}]
        }))
        .unwrap();

        let view = map_view(
            &dataset(),
            &PanelFilter::default(),
            &ClassThresholds::default(),
            Some(&index),
        );
        assert!(view.choropleth);
        assert_eq!(view.features.len(), 1);
        assert_eq!(view.features[0].geometry, polygon);
        assert_eq!(view.features[0].properties.class, Some(HumidityClass::Ideal));
    }

    #[test]
    fn test_serialized_shape() -> Result<(), serde_json::Error> {
        let filter = PanelFilter::default().with_states(["SP"]).with_date_index(0);
        let view = map_view(&dataset(), &filter, &ClassThresholds::default(), None);
        let value = serde_json::to_value(&view)?;

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["center"], json!({"lat": -14.2, "lon": -51.9}));
        assert_eq!(value["legend"].as_array().map(Vec::len), Some(6));
        let props = &value["features"][0]["properties"];
        assert_eq!(props["CD_MUN"], "3550308");
        assert_eq!(props["SIGLA_UF"], "SP");
        assert_eq!(props["RHmin"], 35.0);
        assert_eq!(props["class"], "observation");
        Ok(())
    }
}
