//! Defines the `HumidityClass` enum, mapping a minimum relative humidity value (`RHmin`)
//! to one of six ordered alert categories, and the configurable thresholds behind it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Colour used for rows whose humidity could not be classified.
pub const UNCLASSIFIED_COLOR: &str = "#9CA3AF";

/// Humidity classification derived from the daily minimum relative humidity.
///
/// Variants are declared from the most comfortable to the most critical, which is
/// also the order used by legends and dropdowns ([`HumidityClass::ALL`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumidityClass {
    /// RHmin above 60%.
    Ideal,
    /// RHmin between 41% and 60%.
    NearIdeal,
    /// RHmin between 30% and 40%.
    Observation,
    /// RHmin between 20% and 29%.
    Attention,
    /// RHmin between 12% and 19%.
    Alert,
    /// RHmin below 12%.
    Emergency,
}

impl HumidityClass {
    /// Every class in legend order.
    pub const ALL: [HumidityClass; 6] = [
        HumidityClass::Ideal,
        HumidityClass::NearIdeal,
        HumidityClass::Observation,
        HumidityClass::Attention,
        HumidityClass::Alert,
        HumidityClass::Emergency,
    ];

    /// The Portuguese label shown in legends, cards and listings.
    pub fn label(&self) -> &'static str {
        match self {
            HumidityClass::Ideal => "Ideal (>60%)",
            HumidityClass::NearIdeal => "Quase ideal (41–60%)",
            HumidityClass::Observation => "Observação (30–40%)",
            HumidityClass::Attention => "Atenção (20–29%)",
            HumidityClass::Alert => "Caso de alerta (12–19%)",
            HumidityClass::Emergency => "Emergência (<12%)",
        }
    }

    /// Fill colour for maps, bars and cards.
    pub fn color(&self) -> &'static str {
        match self {
            HumidityClass::Ideal => "#1E3A8A",
            HumidityClass::NearIdeal => "#60A5FA",
            HumidityClass::Observation => "#FEF08A",
            HumidityClass::Attention => "#F59E0B",
            HumidityClass::Alert => "#F87171",
            HumidityClass::Emergency => "#B91C1C",
        }
    }

    /// Text colour that stays readable on top of [`HumidityClass::color`].
    pub fn text_color(&self) -> &'static str {
        match self {
            HumidityClass::NearIdeal | HumidityClass::Observation => "#0b0b0b",
            _ => "white",
        }
    }

    /// Short identifier used in URLs (`ideal`, `near_ideal`, ...).
    pub fn slug(&self) -> &'static str {
        match self {
            HumidityClass::Ideal => "ideal",
            HumidityClass::NearIdeal => "near_ideal",
            HumidityClass::Observation => "observation",
            HumidityClass::Attention => "attention",
            HumidityClass::Alert => "alert",
            HumidityClass::Emergency => "emergency",
        }
    }
}

impl fmt::Display for HumidityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Error returned when a string names no known [`HumidityClass`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown humidity class '{0}'")]
pub struct UnknownClassError(pub String);

/// Parses either the slug (`emergency`) or the full label (`Emergência (<12%)`).
impl FromStr for HumidityClass {
    type Err = UnknownClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        HumidityClass::ALL
            .into_iter()
            .find(|class| class.slug().eq_ignore_ascii_case(wanted) || class.label() == wanted)
            .ok_or_else(|| UnknownClassError(s.to_string()))
    }
}

/// Lower bounds (in % RHmin) separating the classes.
///
/// A value strictly above `ideal_above` is [`HumidityClass::Ideal`]; otherwise the first
/// bound the value reaches (inclusive), from `near_ideal_min` down to `alert_min`, decides
/// the class. Anything from zero up to `alert_min` is an emergency. The bands are
/// contiguous, so fractional values such as 40.5% always receive a class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassThresholds {
    pub ideal_above: f64,
    pub near_ideal_min: f64,
    pub observation_min: f64,
    pub attention_min: f64,
    pub alert_min: f64,
}

impl Default for ClassThresholds {
    fn default() -> Self {
        Self {
            ideal_above: 60.0,
            near_ideal_min: 41.0,
            observation_min: 30.0,
            attention_min: 20.0,
            alert_min: 12.0,
        }
    }
}

impl ClassThresholds {
    /// Classifies a minimum relative humidity value.
    ///
    /// Returns `None` for missing, NaN or negative values.
    pub fn classify(&self, rh_min: Option<f64>) -> Option<HumidityClass> {
        let value = rh_min.filter(|v| v.is_finite() && *v >= 0.0)?;
        let class = if value > self.ideal_above {
            HumidityClass::Ideal
        } else if value >= self.near_ideal_min {
            HumidityClass::NearIdeal
        } else if value >= self.observation_min {
            HumidityClass::Observation
        } else if value >= self.attention_min {
            HumidityClass::Attention
        } else if value >= self.alert_min {
            HumidityClass::Alert
        } else {
            HumidityClass::Emergency
        };
        Some(class)
    }

    /// Checks that the bounds are strictly decreasing.
    pub fn is_ordered(&self) -> bool {
        self.ideal_above >= self.near_ideal_min
            && self.near_ideal_min > self.observation_min
            && self.observation_min > self.attention_min
            && self.attention_min > self.alert_min
            && self.alert_min > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let thresholds = ClassThresholds::default();
        let cases = [
            (75.0, HumidityClass::Ideal),
            (60.5, HumidityClass::Ideal),
            (60.0, HumidityClass::NearIdeal),
            (41.0, HumidityClass::NearIdeal),
            (40.5, HumidityClass::Observation),
            (30.0, HumidityClass::Observation),
            (29.0, HumidityClass::Attention),
            (20.0, HumidityClass::Attention),
            (19.9, HumidityClass::Alert),
            (12.0, HumidityClass::Alert),
            (11.0, HumidityClass::Emergency),
            (0.0, HumidityClass::Emergency),
        ];
        for (value, expected) in cases {
            assert_eq!(
                thresholds.classify(Some(value)),
                Some(expected),
                "RHmin {} should be {:?}",
                value,
                expected
            );
        }
    }

    #[test]
    fn test_unclassifiable_values() {
        let thresholds = ClassThresholds::default();
        assert_eq!(thresholds.classify(None), None);
        assert_eq!(thresholds.classify(Some(f64::NAN)), None);
        assert_eq!(thresholds.classify(Some(-1.0)), None);
    }

    #[test]
    fn test_custom_thresholds_change_result() {
        let strict = ClassThresholds {
            ideal_above: 70.0,
            ..ClassThresholds::default()
        };
        assert_eq!(strict.classify(Some(65.0)), Some(HumidityClass::NearIdeal));
        assert_eq!(
            ClassThresholds::default().classify(Some(65.0)),
            Some(HumidityClass::Ideal)
        );
        assert!(strict.is_ordered());
    }

    #[test]
    fn test_parse_slug_and_label() {
        assert_eq!("emergency".parse(), Ok(HumidityClass::Emergency));
        assert_eq!("Near_Ideal".parse(), Ok(HumidityClass::NearIdeal));
        assert_eq!(
            "Caso de alerta (12–19%)".parse(),
            Ok(HumidityClass::Alert)
        );
        assert!("dry".parse::<HumidityClass>().is_err());
    }

    #[test]
    fn test_text_color_for_light_backgrounds() {
        assert_eq!(HumidityClass::Observation.text_color(), "#0b0b0b");
        assert_eq!(HumidityClass::Emergency.text_color(), "white");
    }
}
