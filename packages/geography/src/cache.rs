//! Process-lifetime cache of boundary layers.
//!
//! Each layer moves from unloaded to loaded exactly once, on first access.
//! The load-if-absent step runs under a mutex so concurrent first access
//! reads the file once. There is no reload or invalidation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crime_hotspots_geography_models::BoundaryKind;

use crate::{BoundaryLayer, GeoError};

/// Loads boundary layers from configured paths and keeps them for reuse.
///
/// Construct one at startup and pass it by reference to every consumer;
/// tests build their own.
#[derive(Debug, Default)]
pub struct BoundaryCache {
    paths: BTreeMap<BoundaryKind, PathBuf>,
    layers: Mutex<BTreeMap<BoundaryKind, Arc<BoundaryLayer>>>,
}

impl BoundaryCache {
    /// Creates an empty cache that will read layers from `paths`.
    #[must_use]
    pub const fn new(paths: BTreeMap<BoundaryKind, PathBuf>) -> Self {
        Self {
            paths,
            layers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the layer for a boundary name such as `"district"`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::UnknownBoundaryName`] if `name` is not a
    /// recognized layer, otherwise any error from [`Self::get_kind`].
    pub fn get(&self, name: &str) -> Result<Arc<BoundaryLayer>, GeoError> {
        let kind = name
            .parse::<BoundaryKind>()
            .map_err(|_| GeoError::UnknownBoundaryName {
                name: name.to_string(),
            })?;
        self.get_kind(kind)
    }

    /// Returns the layer for `kind`, loading it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::NoConfiguredPath`] if the layer has no path,
    /// [`GeoError::BoundaryFileNotFound`] if the file is missing, or a
    /// parse error. Failed loads are not cached.
    pub fn get_kind(&self, kind: BoundaryKind) -> Result<Arc<BoundaryLayer>, GeoError> {
        let mut layers = self.layers.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(layer) = layers.get(&kind) {
            return Ok(Arc::clone(layer));
        }

        let path = self
            .paths
            .get(&kind)
            .ok_or(GeoError::NoConfiguredPath { name: kind })?;

        let layer = Arc::new(BoundaryLayer::load(kind, path)?);
        layers.insert(kind, Arc::clone(&layer));
        drop(layers);

        Ok(layer)
    }

    /// Whether `kind` has been loaded.
    #[must_use]
    pub fn is_loaded(&self, kind: BoundaryKind) -> bool {
        self.layers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }

    /// Configured path for `kind`.
    #[must_use]
    pub fn path(&self, kind: BoundaryKind) -> Option<&PathBuf> {
        self.paths.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"GEOID": "42101000100", "POP100": "3200"},
            "geometry": {"type": "Polygon", "coordinates": [[[-75.2,39.9],[-75.1,39.9],[-75.1,40.0],[-75.2,40.0],[-75.2,39.9]]]}
        }]
    }"#;

    fn fixture_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "crime_hotspots_cache_{test}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_once_and_reuses() {
        let dir = fixture_dir("reuse");
        let path = dir.join("tracts.geojson");
        std::fs::write(&path, TRACTS).unwrap();

        let cache = BoundaryCache::new(BTreeMap::from([(BoundaryKind::Tract, path.clone())]));
        assert!(!cache.is_loaded(BoundaryKind::Tract));

        let first = cache.get("tract").unwrap();
        assert!(cache.is_loaded(BoundaryKind::Tract));
        assert_eq!(first.polygons[0].population, Some(3200));

        // A second access must not touch the file.
        std::fs::remove_file(&path).unwrap();
        let second = cache.get("tract").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn concurrent_first_access_shares_one_layer() {
        let dir = fixture_dir("concurrent");
        let path = dir.join("tracts.geojson");
        std::fs::write(&path, TRACTS).unwrap();

        let cache = BoundaryCache::new(BTreeMap::from([(BoundaryKind::Tract, path)]));
        let layers: Vec<Arc<BoundaryLayer>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| cache.get("tract"))).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        assert_eq!(layers.len(), 8);
        assert!(
            layers.iter().all(|l| Arc::ptr_eq(l, &layers[0])),
            "every thread must receive the single cached layer"
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_name_differs_from_missing_file() {
        let dir = fixture_dir("errors");
        let cache = BoundaryCache::new(BTreeMap::from([(
            BoundaryKind::District,
            dir.join("districts.geojson"),
        )]));

        assert!(matches!(
            cache.get("county"),
            Err(GeoError::UnknownBoundaryName { .. })
        ));
        assert!(matches!(
            cache.get("district"),
            Err(GeoError::BoundaryFileNotFound { .. })
        ));
        assert!(matches!(
            cache.get("tract"),
            Err(GeoError::NoConfiguredPath { .. })
        ));
        assert!(!cache.is_loaded(BoundaryKind::District));

        std::fs::remove_dir_all(&dir).ok();
    }
}
