//! Join-key normalization for boundary layers.
//!
//! Source files disagree on which property holds the key (`DISTRICT_`,
//! `DIST_NUMC`, `dist_num`, ...) and on its type (`"07"`, `7`, `7.0`). Each
//! layer kind lists the column names it recognizes, in priority order; the
//! first one present in the file is used for every feature, and its values
//! are coerced to the canonical [`BoundaryKey`] type.

use crime_hotspots_geography_models::{BoundaryKey, BoundaryKind};
use serde_json::Value;

/// Recognized district number columns, highest priority first.
pub const DISTRICT_KEY_COLUMNS: &[&str] = &[
    "DISTRICT_",
    "DIST_NUMC",
    "DIST_NUM",
    "DISTRICT",
    "district",
    "dist_num",
    "district_number",
    "dc_dist",
];

/// Recognized census tract GEOID columns, highest priority first.
pub const TRACT_KEY_COLUMNS: &[&str] = &["GEOID", "GEOID20", "GEOID10", "geoid", "tract_geoid"];

/// Recognized population columns, highest priority first.
pub const POPULATION_COLUMNS: &[&str] = &[
    "population",
    "POPULATION",
    "total_pop",
    "TOTAL_POP",
    "POP100",
    "pop",
];

/// Key column candidates for a layer kind.
#[must_use]
pub const fn key_columns(kind: BoundaryKind) -> &'static [&'static str] {
    match kind {
        BoundaryKind::District => DISTRICT_KEY_COLUMNS,
        BoundaryKind::Tract => TRACT_KEY_COLUMNS,
    }
}

/// Picks the first candidate present in any feature's properties.
pub fn resolve_column<'a, I>(candidates: &[&'static str], property_sets: I) -> Option<&'static str>
where
    I: IntoIterator<Item = &'a serde_json::Map<String, Value>>,
{
    let sets: Vec<&serde_json::Map<String, Value>> = property_sets.into_iter().collect();
    candidates
        .iter()
        .copied()
        .find(|c| sets.iter().any(|props| props.contains_key(*c)))
}

/// Coerces a raw property value into the layer's canonical key.
///
/// Districts become integers (`"07"`, `7`, and `7.0` all map to `7`).
/// Tracts become trimmed strings; numeric GEOIDs are printed without a
/// fractional part.
#[must_use]
pub fn normalize_key(kind: BoundaryKind, value: &Value) -> Option<BoundaryKey> {
    match kind {
        BoundaryKind::District => integer_value(value).map(BoundaryKey::District),
        BoundaryKind::Tract => match value {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| BoundaryKey::Tract(s.to_string()))
            }
            Value::Number(_) => integer_value(value).map(|n| BoundaryKey::Tract(n.to_string())),
            _ => None,
        },
    }
}

/// Coerces a population property to a non-negative count.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn normalize_population(value: &Value) -> Option<u64> {
    integer_value(value).filter(|n| *n >= 0).map(|n| n as u64)
}

#[allow(clippy::cast_possible_truncation)]
fn integer_value(value: &Value) -> Option<i64> {
    let number = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole))?
        }
        _ => return None,
    };
    Some(number)
}

#[allow(clippy::cast_possible_truncation)]
fn whole(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}
