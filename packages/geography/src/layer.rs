//! Boundary polygon layers parsed from `GeoJSON` feature collections.

use std::path::Path;

use crime_hotspots_geography_models::{BoundaryKey, BoundaryKind, Crs};
use geo::MultiPolygon;
use geojson::GeoJson;

use crate::GeoError;
use crate::reproject::reproject_multipolygon;
use crate::schema::{POPULATION_COLUMNS, key_columns, normalize_key, normalize_population, resolve_column};

/// A named administrative region.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygon {
    /// Normalized join key.
    pub key: BoundaryKey,
    /// Resident population, when the source provides one.
    pub population: Option<u64>,
    /// Region outline.
    pub geometry: MultiPolygon<f64>,
}

/// Every polygon of one boundary layer, in one CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLayer {
    /// Which layer this is.
    pub kind: BoundaryKind,
    /// System the polygon coordinates are expressed in.
    pub crs: Crs,
    /// Polygons in file order.
    pub polygons: Vec<BoundaryPolygon>,
}

impl BoundaryLayer {
    /// Reads and parses a layer file.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::BoundaryFileNotFound`] if `path` does not exist,
    /// or any error from [`Self::from_geojson_str`].
    pub fn load(kind: BoundaryKind, path: &Path) -> Result<Self, GeoError> {
        if !path.exists() {
            return Err(GeoError::BoundaryFileNotFound {
                name: kind,
                path: path.to_path_buf(),
            });
        }

        log::info!("Loading {kind} boundaries from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_geojson_str(kind, &text)
    }

    /// Parses a `FeatureCollection`, normalizing each feature's key.
    ///
    /// The collection's legacy `crs` member, if present, sets the layer's
    /// system; otherwise WGS84 is assumed. Features without a usable key or
    /// without polygonal geometry are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::NotFeatureCollection`] for other `GeoJSON` types,
    /// [`GeoError::MissingKeyColumn`] if no recognized key column exists,
    /// or a parse error.
    pub fn from_geojson_str(kind: BoundaryKind, text: &str) -> Result<Self, GeoError> {
        let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
            return Err(GeoError::NotFeatureCollection { name: kind });
        };
        let crs = declared_crs(collection.foreign_members.as_ref());

        let candidates = key_columns(kind);
        let key_column = resolve_column(
            candidates,
            collection
                .features
                .iter()
                .filter_map(|f| f.properties.as_ref()),
        )
        .ok_or_else(|| GeoError::MissingKeyColumn {
            name: kind,
            candidates: candidates.iter().map(|c| (*c).to_string()).collect(),
        })?;
        let population_column = resolve_column(
            POPULATION_COLUMNS,
            collection
                .features
                .iter()
                .filter_map(|f| f.properties.as_ref()),
        );

        log::debug!(
            "{kind} layer: key column '{key_column}', population column {population_column:?}, {crs}"
        );

        let total = collection.features.len();
        let mut polygons = Vec::with_capacity(total);

        for feature in collection.features {
            let Some(props) = feature.properties.as_ref() else {
                continue;
            };
            let Some(key) = props.get(key_column).and_then(|v| normalize_key(kind, v)) else {
                log::warn!("Skipping {kind} feature with unusable key {:?}", props.get(key_column));
                continue;
            };
            let population = population_column
                .and_then(|c| props.get(c))
                .and_then(normalize_population);

            let Some(geometry) = feature.geometry.and_then(to_multipolygon) else {
                log::warn!("Skipping {kind} feature {key}: geometry is not a polygon");
                continue;
            };

            polygons.push(BoundaryPolygon {
                key,
                population,
                geometry,
            });
        }

        log::info!("Loaded {} of {total} {kind} boundary features", polygons.len());

        Ok(Self {
            kind,
            crs,
            polygons,
        })
    }

    /// Returns a copy of the layer expressed in `target`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::UnsupportedReprojection`] if no transform exists.
    pub fn reprojected(&self, target: Crs) -> Result<Self, GeoError> {
        if self.crs == target {
            return Ok(self.clone());
        }

        log::info!(
            "Reprojecting {} {} boundaries from {} to {target}",
            self.polygons.len(),
            self.kind,
            self.crs
        );

        let polygons = self
            .polygons
            .iter()
            .map(|p| {
                Ok(BoundaryPolygon {
                    key: p.key.clone(),
                    population: p.population,
                    geometry: reproject_multipolygon(&p.geometry, self.crs, target)?,
                })
            })
            .collect::<Result<Vec<_>, GeoError>>()?;

        Ok(Self {
            kind: self.kind,
            crs: target,
            polygons,
        })
    }

    /// Number of polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Whether the layer has no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Finds a polygon by key.
    #[must_use]
    pub fn get(&self, key: &BoundaryKey) -> Option<&BoundaryPolygon> {
        self.polygons.iter().find(|p| &p.key == key)
    }
}

/// Reads `crs.properties.name`, defaulting to WGS84 per RFC 7946.
fn declared_crs(members: Option<&geojson::JsonObject>) -> Crs {
    members
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(serde_json::Value::as_str)
        .and_then(Crs::from_name)
        .unwrap_or_default()
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}
