//! Incident density per administrative area.

use std::collections::BTreeMap;

use crime_hotspots_crime_models::IncidentTable;
use crime_hotspots_geography_models::AreaDensityRow;

use crate::{AnalyticsError, area_label};

#[derive(Default)]
struct AreaExtent {
    count: u64,
    bounds: Option<(f64, f64, f64, f64)>,
}

impl AreaExtent {
    fn add(&mut self, point: Option<(f64, f64)>) {
        self.count += 1;
        let Some((x, y)) = point else {
            return;
        };
        self.bounds = Some(match self.bounds {
            None => (x, x, y, y),
            Some((min_x, max_x, min_y, max_y)) => {
                (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
            }
        });
    }
}

/// Counts incidents per area and normalizes by the area's own point
/// bounding box.
///
/// `density = count / (lat_span * lon_span)`. Areas whose points span zero
/// on either axis report a density of 0. Rows with no area are skipped;
/// rows with no coordinates count toward their area but not its extent.
/// Sorted by density descending, then by area id.
///
/// # Errors
///
/// Returns [`AnalyticsError::Table`] naming any missing column.
#[allow(clippy::cast_precision_loss)]
pub fn compare_area_density(
    table: &IncidentTable,
    area_column: &str,
    x_column: &str,
    y_column: &str,
) -> Result<Vec<AreaDensityRow>, AnalyticsError> {
    table.require_columns(&[area_column, x_column, y_column])?;

    let mut areas: BTreeMap<String, AreaExtent> = BTreeMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        let Some(area) = row.get(area_column).and_then(area_label) else {
            continue;
        };
        let point = table
            .f64_at(i, x_column)
            .zip(table.f64_at(i, y_column))
            .filter(|(x, y)| x.is_finite() && y.is_finite());
        areas.entry(area).or_default().add(point);
    }

    let mut rows: Vec<AreaDensityRow> = areas
        .into_iter()
        .map(|(area_id, extent)| {
            let (lon_span, lat_span) = extent
                .bounds
                .map_or((0.0, 0.0), |(min_x, max_x, min_y, max_y)| {
                    (max_x - min_x, max_y - min_y)
                });
            let box_area = lon_span * lat_span;
            let density = if box_area > 0.0 {
                extent.count as f64 / box_area
            } else {
                0.0
            };

            AreaDensityRow {
                area_id,
                incident_count: extent.count,
                density,
                lon_span,
                lat_span,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.density.total_cmp(&a.density));

    log::info!("Compared incident density across {} areas", rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> IncidentTable {
        IncidentTable::from_csv_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn density_uses_each_area_bounding_box() {
        let incidents = table(
            "district,point_x,point_y\n\
             1,0.0,0.0\n\
             1,1.0,1.0\n\
             1,0.5,0.5\n\
             2,0.0,0.0\n\
             2,0.1,0.1\n",
        );
        let rows = compare_area_density(&incidents, "district", "point_x", "point_y").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].area_id, "2");
        assert!((rows[0].density - 2.0 / 0.01).abs() < 1e-6);
        assert_eq!(rows[1].area_id, "1");
        assert_eq!(rows[1].incident_count, 3);
        assert!((rows[1].density - 3.0).abs() < 1e-12);
        assert!((rows[1].lon_span - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_span_areas_are_kept_with_zero_density() {
        let incidents = table(
            "district,point_x,point_y\n\
             7,0.5,0.5\n\
             7,0.5,0.5\n\
             8,0.0,0.0\n\
             8,1.0,0.0\n\
             9,0.0,0.0\n\
             9,2.0,2.0\n",
        );
        let rows = compare_area_density(&incidents, "district", "point_x", "point_y").unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].area_id, "9");
        assert!(rows.iter().all(|r| r.density.is_finite()));
        assert_eq!(rows[1].area_id, "7", "zero-density ties ordered by area id");
        assert!(rows[1].density.abs() < f64::EPSILON);
        assert_eq!(rows[2].area_id, "8");
        assert!(rows[2].density.abs() < f64::EPSILON);
    }

    #[test]
    fn sorted_descending() {
        let incidents = table(
            "tract_geoid,point_x,point_y\n\
             a,0,0\na,2,2\n\
             b,0,0\nb,1,1\nb,0.5,0.5\n\
             c,0,0\nc,0.2,0.2\n",
        );
        let rows = compare_area_density(&incidents, "tract_geoid", "point_x", "point_y").unwrap();
        assert!(rows.windows(2).all(|w| w[0].density >= w[1].density));
    }

    #[test]
    fn null_areas_are_skipped() {
        let incidents = table("district,point_x,point_y\n,0,0\n3,0,0\n3,1,1\n");
        let rows = compare_area_density(&incidents, "district", "point_x", "point_y").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].incident_count, 2);
    }

    #[test]
    fn missing_columns_are_named() {
        let incidents = table("district,point_x\n1,0\n");
        let err =
            compare_area_density(&incidents, "district", "point_x", "point_y").unwrap_err();
        assert!(err.to_string().contains("point_y"));
    }
}
