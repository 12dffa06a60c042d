#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregations over cleaned, joined incidents.
//!
//! Scores incidents by offense severity, estimates a kernel density surface
//! and its peaks, clusters incidents into hotspot centroids, and compares
//! incident density across administrative areas. Exports write the
//! `GeoJSON` and CSV artifacts the API layer serves.

pub mod area;
pub mod cluster;
pub mod export;
pub mod kde;
pub mod severity;

use crime_hotspots_config::ConfigError;
use crime_hotspots_crime_models::TableError;
use thiserror::Error;

pub use area::compare_area_density;
pub use export::{
    write_area_density_csv, write_area_severity_csv, write_grid_geojson, write_hotspots_geojson,
};
pub use cluster::{cluster_hotspots, dbscan};
pub use kde::{DensityGrid, GaussianKde, HotspotSurface, estimate_hotspots};
pub use severity::{area_severity_totals, rank_by_severity, score_column, with_severity};

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Required column(s) missing, or a column could not be appended.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Loading the fallback configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A numeric parameter is out of range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of what went wrong.
        message: String,
    },

    /// CSV export failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Writing an export failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Label for an area cell; `null` and empty strings have none.
pub(crate) fn area_label(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
