#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary layer loading and caching.
//!
//! Reads police district and census tract polygons from static `GeoJSON`
//! files, normalizes each layer's join key to one canonical column, and
//! reprojects layers between coordinate reference systems. Layers are held
//! by a [`BoundaryCache`] for the lifetime of the process.

pub mod cache;
pub mod layer;
pub mod reproject;
pub mod schema;

use std::path::PathBuf;

use crime_hotspots_geography_models::{BoundaryKind, Crs};
use thiserror::Error;

pub use cache::BoundaryCache;
pub use layer::{BoundaryLayer, BoundaryPolygon};

/// Errors that can occur during boundary operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The configured boundary file does not exist.
    #[error(
        "Boundary file for '{name}' not found at {}. Run the boundary download step first.",
        .path.display()
    )]
    BoundaryFileNotFound {
        /// Layer that was requested.
        name: BoundaryKind,
        /// Path that was checked.
        path: PathBuf,
    },

    /// The requested layer name is not one of the recognized layers.
    #[error("Unknown boundary name '{name}' (expected one of: district, tract)")]
    UnknownBoundaryName {
        /// Name as given by the caller.
        name: String,
    },

    /// A recognized layer has no file path configured.
    #[error("No file path configured for boundary '{name}'")]
    NoConfiguredPath {
        /// Layer that was requested.
        name: BoundaryKind,
    },

    /// The file is valid `GeoJSON` but not a `FeatureCollection`.
    #[error("Boundary file for '{name}' is not a FeatureCollection")]
    NotFeatureCollection {
        /// Layer being loaded.
        name: BoundaryKind,
    },

    /// None of the recognized key columns appear in the layer.
    #[error("No key column for '{name}' boundaries (looked for: {})", .candidates.join(", "))]
    MissingKeyColumn {
        /// Layer being loaded.
        name: BoundaryKind,
        /// Column names that were tried.
        candidates: Vec<String>,
    },

    /// No transform is available between the two systems.
    #[error("Unsupported reprojection from {from} to {to}")]
    UnsupportedReprojection {
        /// Source system.
        from: Crs,
        /// Target system.
        to: Crs,
    },

    /// File read failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
