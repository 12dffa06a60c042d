#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary, coordinate reference system, and density result types.
//!
//! These types are shared by the boundary loader, the spatial join, and the
//! density aggregations. They carry no behavior beyond small lookups so any
//! consumer (including the API layer reading exports) can depend on them
//! cheaply.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Crs {
    /// EPSG code (e.g. 4326).
    pub epsg: u32,
}

impl Crs {
    /// WGS84 longitude/latitude.
    pub const WGS84: Self = Self { epsg: 4326 };
    /// Spherical Web Mercator.
    pub const WEB_MERCATOR: Self = Self { epsg: 3857 };

    /// Creates a CRS from an EPSG code.
    #[must_use]
    pub const fn from_epsg(epsg: u32) -> Self {
        Self { epsg }
    }

    /// Parses the names used by `GeoJSON` `crs` members and GIS tools:
    /// `EPSG:3857`, `urn:ogc:def:crs:EPSG::3857`, and the OGC `CRS84` alias
    /// for WGS84.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let upper = name.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Some(Self::WGS84);
        }

        let code = upper
            .rsplit(':')
            .find(|part| !part.is_empty())
            .filter(|_| upper.contains("EPSG"))?;

        code.parse::<u32>().ok().map(Self::from_epsg)
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::WGS84
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// The recognized boundary layers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BoundaryKind {
    /// Police districts, keyed by district number.
    District,
    /// Census tracts, keyed by GEOID.
    Tract,
}

impl BoundaryKind {
    /// Canonical column name the layer's key is joined under.
    #[must_use]
    pub const fn key_column(self) -> &'static str {
        match self {
            Self::District => "district",
            Self::Tract => "tract_geoid",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::District, Self::Tract]
    }
}

/// Normalized join key of a boundary polygon.
///
/// Ordering is used as the tie-break when a point lies in more than one
/// polygon: the smallest key wins.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundaryKey {
    /// Police district number.
    District(i64),
    /// Census tract GEOID (e.g. "42101000100").
    Tract(String),
}

impl BoundaryKey {
    /// JSON cell value for a joined table.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::District(n) => serde_json::Value::from(*n),
            Self::Tract(geoid) => serde_json::Value::String(geoid.clone()),
        }
    }
}

impl std::fmt::Display for BoundaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::District(n) => write!(f, "{n}"),
            Self::Tract(geoid) => f.write_str(geoid),
        }
    }
}

/// Inclusive longitude/latitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Approximate city limits of Philadelphia.
    pub const PHILADELPHIA: Self = Self {
        min_lon: -75.2803,
        max_lon: -74.9558,
        min_lat: 39.8670,
        max_lat: 40.1379,
    };

    /// Whether `(lon, lat)` lies inside or on the edge of the box.
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }

    /// Whether every edge is finite and each minimum is below its maximum.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.min_lon, self.max_lon, self.min_lat, self.max_lat]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lon < self.max_lon
            && self.min_lat < self.max_lat
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::PHILADELPHIA
    }
}

/// One evaluated cell of a density grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotspotCell {
    /// Grid longitude.
    pub lon: f64,
    /// Grid latitude.
    pub lat: f64,
    /// Estimated density (non-negative).
    pub density: f64,
}

/// A cluster of nearby incidents summarized by its centroid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotspotCluster {
    /// Centroid longitude.
    pub lon: f64,
    /// Centroid latitude.
    pub lat: f64,
    /// Number of incidents in the cluster.
    pub incident_count: u64,
    /// Density estimate at the centroid.
    pub density: f64,
}

/// Incident density for one administrative area, normalized by the area's
/// own point bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDensityRow {
    /// Area identifier (district number, GEOID, ...).
    pub area_id: String,
    /// Incidents in the area.
    pub incident_count: u64,
    /// `incident_count / (lat_span * lon_span)`, or 0 for a zero-span box.
    pub density: f64,
    /// Longitude extent of the area's incidents.
    pub lon_span: f64,
    /// Latitude extent of the area's incidents.
    pub lat_span: f64,
}

/// Total and mean severity for one administrative area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaSeverityRow {
    /// Area identifier.
    pub area_id: String,
    /// Incidents in the area.
    pub incident_count: u64,
    /// Sum of incident severity scores.
    pub total_severity: f64,
    /// `total_severity / incident_count`.
    pub mean_severity: f64,
}
