#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident geometry and boundary attribution.
//!
//! Filters incidents to a configured bounding box, turns their x/y columns
//! into point geometries, and attributes each point to the boundary polygon
//! that contains it using an R-tree over polygon envelopes. The join always
//! returns one row per incident.

pub mod index;
pub mod join;
pub mod points;
pub mod validate;

use crime_hotspots_crime_models::TableError;
use crime_hotspots_geography::GeoError;
use thiserror::Error;

pub use index::BoundaryIndex;
pub use join::{join_with_index, join_within};
pub use points::{PointLayer, to_point_layer};
pub use validate::{check_coordinate_range, filter_to_bounds};

/// Errors that can occur during spatial operations.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Required column(s) missing from the input table.
    #[error(transparent)]
    Table(#[from] TableError),

    /// A coordinate lies outside the valid longitude/latitude range.
    #[error(
        "Invalid coordinate at row {row}: ({lon}, {lat}) is outside longitude -180..180 / latitude -90..90"
    )]
    InvalidCoordinateRange {
        /// Zero-based row index.
        row: usize,
        /// Longitude value found.
        lon: f64,
        /// Latitude value found.
        lat: f64,
    },

    /// Boundary loading or reprojection failed.
    #[error(transparent)]
    Geo(#[from] GeoError),
}
