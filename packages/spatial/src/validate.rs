//! Coordinate checks.
//!
//! Two different policies live here. [`filter_to_bounds`] drops rows that
//! are null or outside the study area; that is routine cleaning.
//! [`check_coordinate_range`] fails on values that cannot be coordinates at
//! all, which means the upstream extract is broken.

use crime_hotspots_crime_models::IncidentTable;
use crime_hotspots_geography_models::BoundingBox;

use crate::SpatialError;

/// Returns the rows whose coordinates are both present and inside `bounds`
/// (edges inclusive).
///
/// # Errors
///
/// Returns [`SpatialError::Table`] naming any missing coordinate column.
pub fn filter_to_bounds(
    table: &IncidentTable,
    x_column: &str,
    y_column: &str,
    bounds: &BoundingBox,
) -> Result<IncidentTable, SpatialError> {
    table.require_columns(&[x_column, y_column])?;

    let filtered = table.filter_rows(|i, _| {
        match (table.f64_at(i, x_column), table.f64_at(i, y_column)) {
            (Some(x), Some(y)) => bounds.contains(x, y),
            _ => false,
        }
    });

    let dropped = table.len() - filtered.len();
    if dropped > 0 {
        log::info!(
            "Dropped {dropped} of {} rows with missing or out-of-bounds coordinates",
            table.len()
        );
    }

    Ok(filtered)
}

/// Fails on the first row whose longitude is outside -180..180 or latitude
/// outside -90..90. Null coordinates are not checked.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidCoordinateRange`] for the first bad row,
/// or [`SpatialError::Table`] naming any missing coordinate column.
pub fn check_coordinate_range(
    table: &IncidentTable,
    x_column: &str,
    y_column: &str,
) -> Result<(), SpatialError> {
    table.require_columns(&[x_column, y_column])?;

    for row in 0..table.len() {
        let x = table.f64_at(row, x_column);
        let y = table.f64_at(row, y_column);

        let lon_ok = x.is_none_or(|lon| (-180.0..=180.0).contains(&lon));
        let lat_ok = y.is_none_or(|lat| (-90.0..=90.0).contains(&lat));

        if !(lon_ok && lat_ok) {
            return Err(SpatialError::InvalidCoordinateRange {
                row,
                lon: x.unwrap_or(f64::NAN),
                lat: y.unwrap_or(f64::NAN),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> IncidentTable {
        IncidentTable::from_csv_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn keeps_only_rows_inside_bounds() {
        let input = table(
            "objectid,point_x,point_y\n\
             1,-75.16,39.95\n\
             2,-74.50,39.95\n\
             3,,39.95\n\
             4,-75.2803,40.1379\n\
             5,-75.10,41.00\n",
        );
        let bounds = BoundingBox::PHILADELPHIA;
        let output = filter_to_bounds(&input, "point_x", "point_y", &bounds).unwrap();

        let ids: Vec<&str> = output
            .rows()
            .iter()
            .filter_map(|r| r.get("objectid").and_then(|v| v.as_str()))
            .collect();
        assert_eq!(ids, vec!["1", "4"]);

        for row in 0..output.len() {
            let x = output.f64_at(row, "point_x").unwrap();
            let y = output.f64_at(row, "point_y").unwrap();
            assert!(bounds.contains(x, y));
        }
        assert_eq!(input.len(), 5, "input must not be modified");
    }

    #[test]
    fn injected_bounds_are_honored() {
        let input = table("point_x,point_y\n-74.50,39.95\n");
        let wide = BoundingBox {
            min_lon: -76.0,
            max_lon: -74.0,
            min_lat: 39.0,
            max_lat: 41.0,
        };
        assert_eq!(filter_to_bounds(&input, "point_x", "point_y", &wide).unwrap().len(), 1);
    }

    #[test]
    fn missing_columns_are_named() {
        let input = table("lng,lat\n-75.1,39.9\n");
        let err = filter_to_bounds(&input, "point_x", "point_y", &BoundingBox::default())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("point_x") && message.contains("point_y"), "{message}");
    }

    #[test]
    fn range_check_raises_on_impossible_longitude() {
        let input = table("point_x,point_y\n-75.1,39.9\n200.0,39.9\n");
        let err = check_coordinate_range(&input, "point_x", "point_y").unwrap_err();
        assert!(matches!(
            err,
            SpatialError::InvalidCoordinateRange { row: 1, .. }
        ));
    }

    #[test]
    fn range_check_ignores_nulls() {
        let input = table("point_x,point_y\n,39.9\n-75.1,\n");
        assert!(check_coordinate_range(&input, "point_x", "point_y").is_ok());
    }
}
