//! `GeoJSON` and CSV artifacts for the API layer.

use std::io::Write;

use crime_hotspots_geography_models::{
    AreaDensityRow, AreaSeverityRow, HotspotCell, HotspotCluster,
};
use serde::Serialize;

use crate::AnalyticsError;

/// Writes hotspot cluster centroids as a point `FeatureCollection`.
///
/// Each feature carries `density`, `incident_count`, and a 1-based `rank`
/// in input order.
///
/// # Errors
///
/// Returns [`AnalyticsError::Json`] or [`AnalyticsError::Io`] if writing
/// fails.
pub fn write_hotspots_geojson<W: Write>(
    clusters: &[HotspotCluster],
    mut writer: W,
) -> Result<(), AnalyticsError> {
    let features: Vec<serde_json::Value> = clusters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            serde_json::json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [c.lon, c.lat]
                },
                "properties": {
                    "density": c.density,
                    "incident_count": c.incident_count,
                    "rank": i + 1,
                }
            })
        })
        .collect();

    write_collection(features, &mut writer)?;
    log::info!("Exported {} hotspot clusters", clusters.len());
    Ok(())
}

/// Writes density grid peaks as a point `FeatureCollection` with `density`
/// and `rank` properties.
///
/// # Errors
///
/// Returns [`AnalyticsError::Json`] or [`AnalyticsError::Io`] if writing
/// fails.
pub fn write_grid_geojson<W: Write>(
    cells: &[HotspotCell],
    mut writer: W,
) -> Result<(), AnalyticsError> {
    let features: Vec<serde_json::Value> = cells
        .iter()
        .enumerate()
        .map(|(i, c)| {
            serde_json::json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [c.lon, c.lat]
                },
                "properties": {
                    "density": c.density,
                    "rank": i + 1,
                }
            })
        })
        .collect();

    write_collection(features, &mut writer)?;
    log::info!("Exported {} grid peaks", cells.len());
    Ok(())
}

fn write_collection<W: Write>(
    features: Vec<serde_json::Value>,
    writer: &mut W,
) -> Result<(), AnalyticsError> {
    let collection = serde_json::json!({
        "type": "FeatureCollection",
        "features": features,
    });
    serde_json::to_writer(&mut *writer, &collection)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes per-area density rows as CSV with a header.
///
/// # Errors
///
/// Returns [`AnalyticsError::Csv`] if writing fails.
pub fn write_area_density_csv<W: Write>(
    rows: &[AreaDensityRow],
    writer: W,
) -> Result<(), AnalyticsError> {
    write_csv(AREA_DENSITY_COLUMNS, rows, writer)
}

/// Writes per-area severity totals as CSV with a header.
///
/// # Errors
///
/// Returns [`AnalyticsError::Csv`] if writing fails.
pub fn write_area_severity_csv<W: Write>(
    rows: &[AreaSeverityRow],
    writer: W,
) -> Result<(), AnalyticsError> {
    write_csv(AREA_SEVERITY_COLUMNS, rows, writer)
}

/// Header of [`write_area_density_csv`], in [`AreaDensityRow`] field order.
pub const AREA_DENSITY_COLUMNS: &[&str] =
    &["area_id", "incident_count", "density", "lon_span", "lat_span"];

/// Header of [`write_area_severity_csv`], in [`AreaSeverityRow`] field order.
pub const AREA_SEVERITY_COLUMNS: &[&str] =
    &["area_id", "incident_count", "total_severity", "mean_severity"];

/// The header is written up front so an empty export is still a valid CSV.
fn write_csv<T: Serialize, W: Write>(
    header: &[&str],
    rows: &[T],
    writer: W,
) -> Result<(), AnalyticsError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::debug!("Wrote {} CSV rows", rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotspot_features_carry_properties() {
        let clusters = vec![
            HotspotCluster {
                lon: -75.16,
                lat: 39.95,
                incident_count: 12,
                density: 40.0,
            },
            HotspotCluster {
                lon: -75.10,
                lat: 40.0,
                incident_count: 5,
                density: 8.5,
            },
        ];

        let mut out = Vec::new();
        write_hotspots_geojson(&clusters, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert_eq!(features[0]["geometry"]["coordinates"][0], -75.16);
        assert_eq!(features[0]["properties"]["incident_count"], 12);
        assert_eq!(features[0]["properties"]["density"], 40.0);
        assert_eq!(features[1]["properties"]["rank"], 2);
    }

    #[test]
    fn empty_collection_is_valid_geojson() {
        let mut out = Vec::new();
        write_grid_geojson(&[], &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn area_density_csv_has_header() {
        let rows = vec![AreaDensityRow {
            area_id: "3".to_string(),
            incident_count: 4,
            density: 2.5,
            lon_span: 1.0,
            lat_span: 1.6,
        }];

        let mut out = Vec::new();
        write_area_density_csv(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("area_id,incident_count,density,lon_span,lat_span")
        );
        assert_eq!(lines.next(), Some("3,4,2.5,1.0,1.6"));
    }

    #[test]
    fn empty_exports_still_have_a_header() {
        let mut out = Vec::new();
        write_area_density_csv(&[], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "area_id,incident_count,density,lon_span,lat_span\n"
        );

        let mut out = Vec::new();
        write_area_severity_csv(&[], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            AREA_SEVERITY_COLUMNS
        );
        assert_eq!(reader.records().count(), 0);
    }

    #[test]
    fn fixed_headers_match_serialized_fields() {
        let mut out = Vec::new();
        let mut writer = csv::Writer::from_writer(&mut out);
        writer
            .serialize(AreaSeverityRow {
                area_id: "1".to_string(),
                incident_count: 1,
                total_severity: 1.0,
                mean_severity: 1.0,
            })
            .unwrap();
        writer.flush().unwrap();
        drop(writer);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().next(), Some(AREA_SEVERITY_COLUMNS.join(",").as_str()));
    }

    #[test]
    fn area_severity_csv_has_header() {
        let rows = vec![AreaSeverityRow {
            area_id: "42101000100".to_string(),
            incident_count: 2,
            total_severity: 16.0,
            mean_severity: 8.0,
        }];

        let mut out = Vec::new();
        write_area_severity_csv(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("area_id,incident_count,total_severity,mean_severity\n"));
        assert!(text.contains("42101000100,2,16.0,8.0"));
    }
}
