//! R-tree index over a boundary layer's polygons.

use crime_hotspots_geography::BoundaryLayer;
use crime_hotspots_geography_models::{BoundaryKey, BoundaryKind, Crs};
use geo::{BoundingRect, Contains, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

/// A boundary polygon stored in the R-tree with its key.
struct BoundaryEntry {
    key: BoundaryKey,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Point-in-polygon lookups for one layer.
pub struct BoundaryIndex {
    kind: BoundaryKind,
    crs: Crs,
    tree: RTree<BoundaryEntry>,
}

impl BoundaryIndex {
    /// Bulk-loads every polygon of `layer`.
    #[must_use]
    pub fn build(layer: &BoundaryLayer) -> Self {
        let entries: Vec<BoundaryEntry> = layer
            .polygons
            .iter()
            .filter_map(|p| {
                Some(BoundaryEntry {
                    key: p.key.clone(),
                    envelope: compute_envelope(&p.geometry)?,
                    polygon: p.geometry.clone(),
                })
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Indexed {} {} polygons", tree.size(), layer.kind);

        Self {
            kind: layer.kind,
            crs: layer.crs,
            tree,
        }
    }

    /// Key of the polygon strictly containing `(x, y)`.
    ///
    /// Points on a polygon edge are not contained. If polygons overlap, the
    /// smallest key wins.
    #[must_use]
    pub fn lookup(&self, x: f64, y: f64) -> Option<&BoundaryKey> {
        let point = geo::Point::new(x, y);
        let query_env = AABB::from_point([x, y]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| &entry.key)
            .min()
    }

    /// Layer the index was built from.
    #[must_use]
    pub const fn kind(&self) -> BoundaryKind {
        self.kind
    }

    /// System the indexed polygons are expressed in.
    #[must_use]
    pub const fn crs(&self) -> Crs {
        self.crs
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`]. Empty
/// geometries have none and are left out of the index.
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
