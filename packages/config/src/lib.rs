#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration for the hotspot pipeline.
//!
//! A default configuration is baked into the binary from `default.toml` at
//! compile time. User files use the same layout; any section they omit
//! falls back to the default values. Set `CRIME_HOTSPOTS_CONFIG` to point
//! [`load_from_env`] at a file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crime_hotspots_crime_models::{
    DEFAULT_SEVERITY_WEIGHT, InvalidWeightTableError, SeverityWeightTable, UcrBand,
};
use crime_hotspots_geography_models::{BoundaryKind, BoundingBox};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "CRIME_HOTSPOTS_CONFIG";

/// Default configuration embedded at compile time.
const DEFAULT_TOML: &str = include_str!("../default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A severity band or weight is invalid.
    #[error("Invalid severity weights: {0}")]
    Weights(#[from] InvalidWeightTableError),

    /// A value is out of range.
    #[error("Invalid config: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HotspotConfig {
    /// Study-area bounding box used to drop out-of-region incidents.
    #[serde(default)]
    pub bounds: BoundingBox,
    /// Incident column names.
    #[serde(default)]
    pub columns: ColumnConfig,
    /// Boundary layer file paths.
    #[serde(default)]
    pub boundaries: BoundaryPaths,
    /// Density and clustering parameters.
    #[serde(default)]
    pub hotspots: HotspotParams,
    /// Severity weights.
    #[serde(default)]
    pub severity: SeverityConfig,
}

/// Incident column names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Identifier column.
    pub id: String,
    /// Longitude column.
    pub x: String,
    /// Latitude column.
    pub y: String,
    /// Offense code column.
    pub code: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            id: "objectid".to_string(),
            x: "point_x".to_string(),
            y: "point_y".to_string(),
            code: "ucr_general".to_string(),
        }
    }
}

/// Where each boundary layer's `GeoJSON` file lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BoundaryPaths {
    /// Police district polygons.
    pub district: PathBuf,
    /// Census tract polygons.
    pub tract: PathBuf,
}

impl BoundaryPaths {
    /// Paths keyed by layer.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<BoundaryKind, PathBuf> {
        BTreeMap::from([
            (BoundaryKind::District, self.district.clone()),
            (BoundaryKind::Tract, self.tract.clone()),
        ])
    }
}

impl Default for BoundaryPaths {
    fn default() -> Self {
        Self {
            district: PathBuf::from("data/boundaries/police_districts.geojson"),
            tract: PathBuf::from("data/boundaries/census_tracts.geojson"),
        }
    }
}

/// Density and clustering parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HotspotParams {
    /// Gaussian kernel bandwidth, in coordinate units.
    pub bandwidth: f64,
    /// Grid resolution per axis.
    pub grid_size: usize,
    /// Number of peak cells to report.
    pub top_k: usize,
    /// Clustering neighborhood radius, in coordinate units.
    pub cluster_eps: f64,
    /// Minimum neighbors (including the point itself) for a core point.
    pub min_samples: usize,
}

impl Default for HotspotParams {
    fn default() -> Self {
        Self {
            bandwidth: 0.01,
            grid_size: 100,
            top_k: 10,
            cluster_eps: 0.005,
            min_samples: 5,
        }
    }
}

/// Severity weights as written in the file. Band keys are strings in TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    /// Weight for bands missing from `weights`.
    pub default_weight: f64,
    /// Band (`"100"`, `"200"`, ...) to weight.
    pub weights: BTreeMap<String, f64>,
}

impl SeverityConfig {
    /// Builds the validated lookup table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a non-integer band key, or
    /// [`ConfigError::Weights`] for an invalid band or weight.
    pub fn weight_table(&self) -> Result<SeverityWeightTable, ConfigError> {
        let weights = self
            .weights
            .iter()
            .map(|(band, weight)| {
                band.trim()
                    .parse::<i64>()
                    .map(|band| (band, *weight))
                    .map_err(|_| ConfigError::Invalid {
                        message: format!("severity band '{band}' is not an integer"),
                    })
            })
            .collect::<Result<BTreeMap<i64, f64>, ConfigError>>()?;

        Ok(SeverityWeightTable::new(weights, self.default_weight)?)
    }
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            default_weight: DEFAULT_SEVERITY_WEIGHT,
            weights: UcrBand::all()
                .iter()
                .map(|b| (b.band().to_string(), b.reference_weight()))
                .collect(),
        }
    }
}

impl HotspotConfig {
    /// Returns the embedded default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `default.toml` is malformed (this is a
    /// compile-time guarantee since the file is embedded).
    #[must_use]
    pub fn default_config() -> Self {
        Self::from_toml_str(DEFAULT_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded default.toml: {e}"))
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML, or a validation
    /// error from [`Self::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or any error
    /// from [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Checks ranges that the schema alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value, or
    /// [`ConfigError::Weights`] for bad severity weights.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bounds.is_valid() {
            return Err(invalid(format!(
                "bounds must be finite with min < max, got {:?}",
                self.bounds
            )));
        }

        let h = &self.hotspots;
        if !(h.bandwidth.is_finite() && h.bandwidth > 0.0) {
            return Err(invalid(format!("hotspots.bandwidth must be positive, got {}", h.bandwidth)));
        }
        if h.grid_size == 0 {
            return Err(invalid("hotspots.grid_size must be at least 1".to_string()));
        }
        if !(h.cluster_eps.is_finite() && h.cluster_eps > 0.0) {
            return Err(invalid(format!(
                "hotspots.cluster_eps must be positive, got {}",
                h.cluster_eps
            )));
        }
        if h.min_samples == 0 {
            return Err(invalid("hotspots.min_samples must be at least 1".to_string()));
        }

        self.severity.weight_table()?;
        Ok(())
    }
}

/// Loads the file named by [`CONFIG_ENV_VAR`], or the embedded default when
/// the variable is unset.
///
/// # Errors
///
/// Returns any error from [`HotspotConfig::load`].
pub fn load_from_env() -> Result<HotspotConfig, ConfigError> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => HotspotConfig::load(Path::new(&path)),
        None => {
            log::debug!("{CONFIG_ENV_VAR} not set, using embedded defaults");
            Ok(HotspotConfig::default_config())
        }
    }
}

const fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid { message }
}
