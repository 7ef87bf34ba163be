//! Optional municipality polygons, matched to forecast rows by IBGE code.

use crate::utils::{code_from_all_digits, normalize_code};
use crate::views::error::BoundaryError;
use log::{info, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tokio::{fs, task};

/// Property names that commonly hold the IBGE code in municipality boundary files.
const CODE_PROPERTIES: [&str; 9] = [
    "CD_MUN",
    "CD_GEOCMU",
    "CD_GEOCODI",
    "CD_MUNIC",
    "CD_IBGE",
    "GEOCODIGO",
    "GEOCODE",
    "GEOCOD_M",
    "codigo_ibge",
];

/// Geometries keyed by seven-digit municipality code.
#[derive(Debug, Clone, Default)]
pub struct BoundaryIndex {
    geometries: HashMap<String, Value>,
}

impl BoundaryIndex {
    /// Loads a boundary FeatureCollection.
    ///
    /// Returns `Ok(None)` when the file does not exist, so the map falls back to points.
    pub async fn load(path: &Path) -> Result<Option<Self>, BoundaryError> {
        if fs::metadata(path).await.is_err() {
            info!(
                "Boundary file {:?} not found, map will use municipality points",
                path
            );
            return Ok(None);
        }

        let bytes = fs::read(path)
            .await
            .map_err(|e| BoundaryError::Io(path.to_path_buf(), e))?;
        let path_buf = path.to_path_buf();
        let index = task::spawn_blocking(move || {
            let value: Value = serde_json::from_slice(&bytes)
                .map_err(|e| BoundaryError::Json(path_buf.clone(), e))?;
            Self::from_geojson(&value).ok_or(BoundaryError::NoFeatures(path_buf))
        })
        .await??;

        info!("Loaded {} municipality boundaries from {:?}", index.len(), path);
        Ok(Some(index))
    }

    /// Indexes the features of a parsed FeatureCollection. `None` when there is no
    /// `features` array.
    pub fn from_geojson(collection: &Value) -> Option<Self> {
        let features = collection.get("features")?.as_array()?;
        let mut geometries = HashMap::with_capacity(features.len());
        let mut skipped = 0usize;
        for feature in features {
            let code = feature
                .get("properties")
                .and_then(Value::as_object)
                .and_then(guess_code);
            match (code, feature.get("geometry")) {
                (Some(code), Some(geometry)) if !geometry.is_null() => {
                    geometries.entry(code).or_insert_with(|| geometry.clone());
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("{} boundary features had no usable code or geometry", skipped);
        }
        Some(Self { geometries })
    }

    pub fn geometry(&self, code: &str) -> Option<&Value> {
        self.geometries.get(code)
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

/// Finds the municipality code among a feature's properties.
///
/// The well-known property names are tried first, then any property whose digits look
/// like a code. As a last resort a `CD_MUN` value is normalised as is.
pub fn guess_code(properties: &Map<String, Value>) -> Option<String> {
    CODE_PROPERTIES
        .iter()
        .filter_map(|key| properties.get(*key))
        .chain(properties.values())
        .find_map(|value| code_from_all_digits(&property_text(value)?))
        .or_else(|| {
            properties
                .get("CD_MUN")
                .and_then(property_text)
                .and_then(|text| normalize_code(&text))
        })
}

fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square() -> Value {
        json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]})
    }

    #[test]
    fn test_guess_code_prefers_known_properties() {
        let props = json!({"NAME": "Brasília", "area": 5760784, "CD_GEOCMU": "5300108"});
        assert_eq!(
            guess_code(props.as_object().unwrap()).as_deref(),
            Some("5300108")
        );
    }

    #[test]
    fn test_guess_code_pads_six_digits_and_scans_other_values() {
        let props = json!({"codigo_ibge": 110001});
        assert_eq!(
            guess_code(props.as_object().unwrap()).as_deref(),
            Some("0110001")
        );

        let props = json!({"id": "BR-3550308", "nome": "São Paulo"});
        assert_eq!(
            guess_code(props.as_object().unwrap()).as_deref(),
            Some("3550308")
        );

        let props = json!({"nome": "sem código"});
        assert_eq!(guess_code(props.as_object().unwrap()), None);
    }

    #[test]
    fn test_from_geojson_indexes_by_code() {
        let collection = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"CD_MUN": "5300108"}, "geometry": square()},
                {"type": "Feature", "properties": {"nome": "x"}, "geometry": square()},
                {"type": "Feature", "properties": {"CD_MUN": "3550308"}, "geometry": null}
            ]
        });
        let index = BoundaryIndex::from_geojson(&collection).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.geometry("5300108"), Some(&square()));
        assert!(index.geometry("3550308").is_none());
        assert!(BoundaryIndex::from_geojson(&json!({"type": "Feature"})).is_none());
    }

    #[tokio::test]
    async fn test_load_missing_and_present() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        assert!(BoundaryIndex::load(&tmp.path().join("none.geojson"))
            .await?
            .is_none());

        let path = tmp.path().join("municipios.geojson");
        let collection = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"CD_MUN": 5300108}, "geometry": square()}]
        });
        std::fs::write(&path, serde_json::to_vec(&collection)?)?;
        let index = BoundaryIndex::load(&path).await?.expect("file exists");
        assert!(index.geometry("5300108").is_some());

        let broken = tmp.path().join("broken.geojson");
        std::fs::write(&broken, b"{ not json")?;
        assert!(matches!(
            BoundaryIndex::load(&broken).await,
            Err(BoundaryError::Json(..))
        ));
        Ok(())
    }
}
