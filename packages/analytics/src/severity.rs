//! Offense severity scoring.

use std::collections::BTreeMap;

use crime_hotspots_config::load_from_env;
use crime_hotspots_crime_models::{IncidentTable, SeverityWeightTable};
use crime_hotspots_geography_models::AreaSeverityRow;
use serde_json::Value;

use crate::{AnalyticsError, area_label};

/// Column appended by [`with_severity`] and [`rank_by_severity`].
pub const SEVERITY_COLUMN: &str = "severity";

/// Scores every row by its offense code's hundred band.
///
/// Codes that are missing, non-numeric, or in a band absent from the table
/// score the table's default weight. When `weights` is `None` the table is
/// taken from the configuration (see
/// [`crime_hotspots_config::load_from_env`]).
///
/// # Errors
///
/// Returns [`AnalyticsError::Table`] if `code_column` is missing, or
/// [`AnalyticsError::Config`] if the fallback configuration cannot load.
pub fn score_column(
    table: &IncidentTable,
    code_column: &str,
    weights: Option<&SeverityWeightTable>,
) -> Result<Vec<f64>, AnalyticsError> {
    let codes = table.column_f64(code_column)?;

    let loaded;
    let weights = if let Some(weights) = weights {
        weights
    } else {
        loaded = load_from_env()?.severity.weight_table()?;
        &loaded
    };

    Ok(codes.into_iter().map(|c| weights.score_code(c)).collect())
}

/// Returns a copy of `table` with a `severity` column.
///
/// # Errors
///
/// See [`score_column`].
pub fn with_severity(
    table: &IncidentTable,
    code_column: &str,
    weights: Option<&SeverityWeightTable>,
) -> Result<IncidentTable, AnalyticsError> {
    let scores = score_column(table, code_column, weights)?;
    Ok(table.with_column(SEVERITY_COLUMN, scores.into_iter().map(Value::from).collect())?)
}

/// Returns a copy of `table` with a `severity` column, rows ordered by
/// severity descending. Equal scores keep their input order.
///
/// # Errors
///
/// Returns [`AnalyticsError::Table`] if `scores` does not have one entry
/// per row.
pub fn rank_by_severity(
    table: &IncidentTable,
    scores: &[f64],
) -> Result<IncidentTable, AnalyticsError> {
    let scored = table.with_column(
        SEVERITY_COLUMN,
        scores.iter().copied().map(Value::from).collect(),
    )?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    Ok(scored.reorder(&order))
}

/// Sums severity per area. Rows with no area are skipped.
///
/// Sorted by total severity descending, then by area id.
///
/// # Errors
///
/// Returns [`AnalyticsError::Table`] if `area_column` is missing, or
/// [`AnalyticsError::InvalidParameter`] if `scores` does not have one entry
/// per row.
#[allow(clippy::cast_precision_loss)]
pub fn area_severity_totals(
    table: &IncidentTable,
    area_column: &str,
    scores: &[f64],
) -> Result<Vec<AreaSeverityRow>, AnalyticsError> {
    table.require_columns(&[area_column])?;
    if scores.len() != table.len() {
        return Err(AnalyticsError::InvalidParameter {
            message: format!(
                "{} severity scores for {} rows",
                scores.len(),
                table.len()
            ),
        });
    }

    let mut totals: BTreeMap<String, (u64, f64)> = BTreeMap::new();
    for (row, score) in table.rows().iter().zip(scores) {
        let Some(area) = row.get(area_column).and_then(area_label) else {
            continue;
        };
        let entry = totals.entry(area).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += score;
    }

    let mut rows: Vec<AreaSeverityRow> = totals
        .into_iter()
        .map(|(area_id, (incident_count, total_severity))| AreaSeverityRow {
            area_id,
            incident_count,
            total_severity,
            mean_severity: total_severity / incident_count as f64,
        })
        .collect();
    rows.sort_by(|a, b| b.total_severity.total_cmp(&a.total_severity));

    Ok(rows)
}
