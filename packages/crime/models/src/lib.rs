#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident records, the hundred-band offense taxonomy, and severity
//! weights.
//!
//! Offense codes follow the UCR "general" convention where the hundreds
//! digit names the offense family (100 homicide, 300 robbery, ...). Every
//! code is collapsed to its band before a severity weight is looked up, so
//! `306` and `300` always score the same.

pub mod table;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

pub use table::{IncidentTable, Row, TableError, value_as_f64};

/// Hundred-band offense families.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UcrBand {
    /// 100: criminal homicide
    Homicide = 100,
    /// 200: rape
    Rape = 200,
    /// 300: robbery
    Robbery = 300,
    /// 400: aggravated assault
    AggravatedAssault = 400,
    /// 500: burglary
    Burglary = 500,
    /// 600: theft
    Theft = 600,
    /// 700: motor vehicle theft
    MotorVehicleTheft = 700,
    /// 800: other assaults
    OtherAssault = 800,
    /// 900: arson
    Arson = 900,
}

impl UcrBand {
    /// Returns the band value (100, 200, ...).
    #[must_use]
    pub const fn band(self) -> i64 {
        self as i64
    }

    /// Looks up the family for a band value.
    #[must_use]
    pub const fn from_band(band: i64) -> Option<Self> {
        match band {
            100 => Some(Self::Homicide),
            200 => Some(Self::Rape),
            300 => Some(Self::Robbery),
            400 => Some(Self::AggravatedAssault),
            500 => Some(Self::Burglary),
            600 => Some(Self::Theft),
            700 => Some(Self::MotorVehicleTheft),
            800 => Some(Self::OtherAssault),
            900 => Some(Self::Arson),
            _ => None,
        }
    }

    /// Severity weight used when no configuration overrides it.
    #[must_use]
    pub const fn reference_weight(self) -> f64 {
        match self {
            Self::Homicide => 10.0,
            Self::Rape => 9.0,
            Self::AggravatedAssault => 8.0,
            Self::Robbery => 6.0,
            Self::Burglary => 4.0,
            Self::MotorVehicleTheft => 3.0,
            Self::OtherAssault => 2.0,
            Self::Theft => 1.0,
            Self::Arson => 0.5,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Homicide,
            Self::Rape,
            Self::Robbery,
            Self::AggravatedAssault,
            Self::Burglary,
            Self::Theft,
            Self::MotorVehicleTheft,
            Self::OtherAssault,
            Self::Arson,
        ]
    }
}

/// Collapses an offense code to its hundred band (`306` -> `300`).
///
/// Uses floor division, so negative codes band downward. Non-finite codes
/// have no band.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn offense_band(code: f64) -> Option<i64> {
    if code.is_finite() {
        Some(((code / 100.0).floor() * 100.0) as i64)
    } else {
        None
    }
}

/// Fallback weight for bands missing from the table.
pub const DEFAULT_SEVERITY_WEIGHT: f64 = 0.5;

/// Error returned when a [`SeverityWeightTable`] is built from invalid
/// bands or weights.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidWeightTableError {
    /// Band keys must be non-negative multiples of 100.
    #[error("invalid severity band {band}: expected a non-negative multiple of 100")]
    Band {
        /// The offending key.
        band: i64,
    },
    /// Weights must be positive and finite.
    #[error("invalid severity weight {weight} for band {band}: expected a positive number")]
    Weight {
        /// Band the weight was given for.
        band: i64,
        /// The offending weight.
        weight: f64,
    },
    /// The default weight must be positive and finite.
    #[error("invalid default severity weight {0}: expected a positive number")]
    DefaultWeight(f64),
}

/// Band -> weight lookup with an explicit fallback for unknown bands.
///
/// Unknown or unparseable codes are not an error: they score
/// [`Self::default_weight`] so a single malformed code never blocks a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityWeightTable {
    weights: BTreeMap<i64, f64>,
    default_weight: f64,
}

impl SeverityWeightTable {
    /// Builds a table, validating every band and weight.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWeightTableError`] if a band is not a non-negative
    /// multiple of 100 or a weight is not positive and finite.
    pub fn new(
        weights: BTreeMap<i64, f64>,
        default_weight: f64,
    ) -> Result<Self, InvalidWeightTableError> {
        if !is_positive_weight(default_weight) {
            return Err(InvalidWeightTableError::DefaultWeight(default_weight));
        }
        for (&band, &weight) in &weights {
            if band < 0 || band % 100 != 0 {
                return Err(InvalidWeightTableError::Band { band });
            }
            if !is_positive_weight(weight) {
                return Err(InvalidWeightTableError::Weight { band, weight });
            }
        }

        Ok(Self {
            weights,
            default_weight,
        })
    }

    /// The built-in table: one entry per [`UcrBand`], default
    /// [`DEFAULT_SEVERITY_WEIGHT`].
    #[must_use]
    pub fn reference() -> Self {
        Self {
            weights: UcrBand::all()
                .iter()
                .map(|b| (b.band(), b.reference_weight()))
                .collect(),
            default_weight: DEFAULT_SEVERITY_WEIGHT,
        }
    }

    /// Weight applied to bands absent from the table.
    #[must_use]
    pub const fn default_weight(&self) -> f64 {
        self.default_weight
    }

    /// Configured band weights.
    #[must_use]
    pub const fn weights(&self) -> &BTreeMap<i64, f64> {
        &self.weights
    }

    /// Weight for a band, or the default when the band is unknown or absent.
    #[must_use]
    pub fn weight_for_band(&self, band: Option<i64>) -> f64 {
        band.and_then(|b| self.weights.get(&b))
            .copied()
            .unwrap_or(self.default_weight)
    }

    /// Scores a raw offense code. `None` (non-numeric) scores the default.
    #[must_use]
    pub fn score_code(&self, code: Option<f64>) -> f64 {
        self.weight_for_band(code.and_then(offense_band))
    }
}

impl Default for SeverityWeightTable {
    fn default() -> Self {
        Self::reference()
    }
}

fn is_positive_weight(weight: f64) -> bool {
    weight.is_finite() && weight > 0.0
}

/// A single incident as read from storage.
///
/// Field names serialize to the column names of the source extract so a
/// record converts directly into an [`IncidentTable`] row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// Source identifier.
    #[serde(rename = "objectid")]
    pub id: String,
    /// Dispatch time, if known.
    #[serde(rename = "dispatch_date_time", default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Longitude.
    #[serde(rename = "point_x", default)]
    pub x: Option<f64>,
    /// Latitude.
    #[serde(rename = "point_y", default)]
    pub y: Option<f64>,
    /// Offense taxonomy code (e.g. 306).
    #[serde(rename = "ucr_general", default)]
    pub offense_code: Option<i64>,
    /// Any additional administrative attributes.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl IncidentRecord {
    /// Column names produced by the fixed fields, in export order.
    pub const FIXED_COLUMNS: &'static [&'static str] = &[
        "objectid",
        "dispatch_date_time",
        "point_x",
        "point_y",
        "ucr_general",
    ];

    /// Creates a record with coordinates and a code and no attributes.
    #[must_use]
    pub fn new(id: &str, x: f64, y: f64, offense_code: i64) -> Self {
        Self {
            id: id.to_string(),
            timestamp: None,
            x: Some(x),
            y: Some(y),
            offense_code: Some(offense_code),
            attributes: BTreeMap::new(),
        }
    }

    /// The record's offense family, if its band is a known one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ucr_band(&self) -> Option<UcrBand> {
        self.offense_code
            .and_then(|c| offense_band(c as f64))
            .and_then(UcrBand::from_band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banding_floors_to_hundreds() {
        assert_eq!(offense_band(306.0), Some(300));
        assert_eq!(offense_band(300.0), Some(300));
        assert_eq!(offense_band(99.0), Some(0));
        assert_eq!(offense_band(-1.0), Some(-100));
        assert_eq!(offense_band(f64::NAN), None);
    }

    #[test]
    fn reference_table_is_monotone_on_listed_bands() {
        let table = SeverityWeightTable::reference();
        let score = |c: f64| table.score_code(Some(c));
        assert!((score(100.0) - 10.0).abs() < f64::EPSILON);
        assert!(score(100.0) > score(300.0));
        assert!(score(300.0) > score(600.0));
        assert!(score(600.0) > score(900.0));
        assert!((score(900.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_bands_use_default() {
        let table = SeverityWeightTable::reference();
        assert!((table.score_code(Some(1800.0)) - DEFAULT_SEVERITY_WEIGHT).abs() < f64::EPSILON);
        assert!((table.score_code(None) - DEFAULT_SEVERITY_WEIGHT).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_invalid_bands_and_weights() {
        assert_eq!(
            SeverityWeightTable::new(BTreeMap::from([(150, 1.0)]), 0.5),
            Err(InvalidWeightTableError::Band { band: 150 })
        );
        assert!(matches!(
            SeverityWeightTable::new(BTreeMap::from([(100, -1.0)]), 0.5),
            Err(InvalidWeightTableError::Weight { band: 100, .. })
        ));
        assert!(SeverityWeightTable::new(BTreeMap::new(), 0.0).is_err());
    }

    #[test]
    fn band_roundtrip() {
        for band in UcrBand::all() {
            assert_eq!(UcrBand::from_band(band.band()), Some(*band));
        }
        assert_eq!(UcrBand::from_band(1000), None);
    }

    #[test]
    fn record_band_lookup() {
        let record = IncidentRecord::new("1", -75.0, 40.0, 615);
        assert_eq!(record.ucr_band(), Some(UcrBand::Theft));
        assert_eq!(UcrBand::Theft.to_string(), "THEFT");
    }
}
