//! Containment left join between incident points and a boundary layer.

use std::borrow::Cow;

use crime_hotspots_crime_models::IncidentTable;
use crime_hotspots_geography::BoundaryLayer;
use serde_json::Value;

use crate::{BoundaryIndex, PointLayer, SpatialError};

/// Attributes every incident to the polygon containing it.
///
/// The output has exactly one row per input row, in input order, with the
/// layer's canonical key column appended (`null` when no polygon contains
/// the point or the row has no geometry). If the layer's CRS differs from
/// the points', the layer is reprojected to match; the points are never
/// transformed. Geometry is not carried into the result.
///
/// # Errors
///
/// Returns [`SpatialError::Geo`] if the layer cannot be reprojected.
pub fn join_within(points: &PointLayer, layer: &BoundaryLayer) -> Result<IncidentTable, SpatialError> {
    let layer = if layer.crs == points.crs() {
        Cow::Borrowed(layer)
    } else {
        Cow::Owned(layer.reprojected(points.crs())?)
    };

    let index = BoundaryIndex::build(&layer);
    join_with_index(points, &index)
}

/// Same as [`join_within`] against a pre-built index. The index must
/// already be in the points' CRS.
///
/// # Errors
///
/// Returns [`SpatialError::Table`] if the key column cannot be appended.
pub fn join_with_index(
    points: &PointLayer,
    index: &BoundaryIndex,
) -> Result<IncidentTable, SpatialError> {
    if index.crs() != points.crs() {
        log::warn!(
            "Joining {} points against a {} index; results will be empty",
            points.crs(),
            index.crs()
        );
    }

    let keys: Vec<Value> = points
        .points()
        .iter()
        .map(|p| {
            p.and_then(|p| index.lookup(p.x(), p.y()))
                .map_or(Value::Null, |k| k.to_json())
        })
        .collect();

    let matched = keys.iter().filter(|k| !k.is_null()).count();
    log::info!(
        "Attributed {matched} of {} incidents to {} polygons",
        keys.len(),
        index.kind()
    );

    Ok(points
        .table()
        .with_column(index.kind().key_column(), keys)?)
}
