//! Point geometry for incident tables.

use crime_hotspots_crime_models::IncidentTable;
use crime_hotspots_geography_models::Crs;
use geo::Point;

use crate::SpatialError;
use crate::validate::check_coordinate_range;

/// An incident table paired with one optional point per row.
///
/// Rows whose x or y is missing carry `None` and are skipped by anything
/// that needs geometry. The table itself is an unmodified copy of the
/// caller's.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLayer {
    table: IncidentTable,
    points: Vec<Option<Point<f64>>>,
    crs: Crs,
}

impl PointLayer {
    /// The source rows.
    #[must_use]
    pub const fn table(&self) -> &IncidentTable {
        &self.table
    }

    /// One entry per row.
    #[must_use]
    pub fn points(&self) -> &[Option<Point<f64>>] {
        &self.points
    }

    /// System the points are expressed in.
    #[must_use]
    pub const fn crs(&self) -> Crs {
        self.crs
    }

    /// Number of rows (with or without geometry).
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the layer has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Rows that have geometry, with their row index.
    pub fn located(&self) -> impl Iterator<Item = (usize, Point<f64>)> + '_ {
        self.points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (i, p)))
    }

    /// `(x, y)` of every row that has geometry.
    #[must_use]
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.located().map(|(_, p)| (p.x(), p.y())).collect()
    }
}

/// Builds a point for every row from `x_column`/`y_column`.
///
/// No bounds filtering happens here. For WGS84 input the coordinate range
/// is checked first, so a structurally impossible value fails before any
/// geometry is built.
///
/// # Errors
///
/// Returns [`SpatialError::Table`] naming a missing column, or
/// [`SpatialError::InvalidCoordinateRange`] for WGS84 values outside
/// -180..180 / -90..90.
pub fn to_point_layer(
    table: &IncidentTable,
    x_column: &str,
    y_column: &str,
    crs: Crs,
) -> Result<PointLayer, SpatialError> {
    table.require_columns(&[x_column, y_column])?;

    if crs == Crs::WGS84 {
        check_coordinate_range(table, x_column, y_column)?;
    }

    let points: Vec<Option<Point<f64>>> = (0..table.len())
        .map(|row| {
            let x = table.f64_at(row, x_column)?;
            let y = table.f64_at(row, y_column)?;
            Some(Point::new(x, y))
        })
        .collect();

    let missing = points.iter().filter(|p| p.is_none()).count();
    if missing > 0 {
        log::debug!("{missing} of {} rows have no geometry", points.len());
    }

    Ok(PointLayer {
        table: table.clone(),
        points,
        crs,
    })
}
