//! Density-based clustering of incidents into hotspot centroids.

use crime_hotspots_geography_models::HotspotCluster;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::AnalyticsError;
use crate::kde::GaussianKde;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Groups `points` with DBSCAN.
///
/// A point with at least `min_samples` neighbors within `eps` (itself
/// included) is a core point; clusters grow through core points. Returns
/// each cluster's point indices in discovery order. Noise points belong to
/// no cluster.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] if `eps` is not positive or
/// `min_samples` is zero.
pub fn dbscan(
    points: &[(f64, f64)],
    eps: f64,
    min_samples: usize,
) -> Result<Vec<Vec<usize>>, AnalyticsError> {
    if !(eps.is_finite() && eps > 0.0) {
        return Err(AnalyticsError::InvalidParameter {
            message: format!("cluster eps must be positive, got {eps}"),
        });
    }
    if min_samples == 0 {
        return Err(AnalyticsError::InvalidParameter {
            message: "min_samples must be at least 1".to_string(),
        });
    }

    let tree = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| IndexedPoint::new([x, y], i))
            .collect(),
    );
    let eps_sq = eps * eps;
    let neighbors = |i: usize| -> Vec<usize> {
        let (x, y) = points[i];
        let mut found: Vec<usize> = tree
            .locate_within_distance([x, y], eps_sq)
            .map(|p| p.data)
            .collect();
        found.sort_unstable();
        found
    };

    let mut scan = ScanState::new(points.len());
    let mut clusters = Vec::new();

    for start in 0..points.len() {
        if scan.visited[start] {
            continue;
        }
        scan.visited[start] = true;

        let seeds = neighbors(start);
        if seeds.len() < min_samples {
            continue;
        }

        let (members, _) = scan.expand(start, &seeds, &neighbors, min_samples);
        clusters.push(members);
    }

    log::debug!(
        "DBSCAN found {} clusters, {} noise points",
        clusters.len(),
        scan.assigned.iter().filter(|a| !**a).count()
    );

    Ok(clusters)
}

/// Per-point flags shared across cluster expansions.
struct ScanState {
    visited: Vec<bool>,
    assigned: Vec<bool>,
    enqueued: Vec<bool>,
}

impl ScanState {
    fn new(n: usize) -> Self {
        Self {
            visited: vec![false; n],
            assigned: vec![false; n],
            enqueued: vec![false; n],
        }
    }

    /// Grows a cluster from core point `start`. Returns its sorted members
    /// and how many points entered the work queue. A point is queued at
    /// most once per scan.
    fn expand<F>(
        &mut self,
        start: usize,
        seeds: &[usize],
        neighbors: F,
        min_samples: usize,
    ) -> (Vec<usize>, usize)
    where
        F: Fn(usize) -> Vec<usize>,
    {
        let mut members = vec![start];
        self.assigned[start] = true;
        self.enqueued[start] = true;

        let mut queue = Vec::new();
        self.enqueue(&mut queue, seeds);
        let mut next = 0;

        while next < queue.len() {
            let i = queue[next];
            next += 1;

            if !self.visited[i] {
                self.visited[i] = true;
                let reach = neighbors(i);
                if reach.len() >= min_samples {
                    self.enqueue(&mut queue, &reach);
                }
            }
            if !self.assigned[i] {
                self.assigned[i] = true;
                members.push(i);
            }
        }

        members.sort_unstable();
        (members, queue.len())
    }

    fn enqueue(&mut self, queue: &mut Vec<usize>, candidates: &[usize]) {
        for &j in candidates {
            if !self.enqueued[j] && !self.assigned[j] {
                self.enqueued[j] = true;
                queue.push(j);
            }
        }
    }
}

/// Clusters `points` and summarizes each cluster as a hotspot.
///
/// Each hotspot sits at its cluster's centroid, with the density of a
/// Gaussian KDE over all points evaluated there. Sorted by density
/// descending, then by incident count descending.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] for a bad `eps`,
/// `min_samples`, or `bandwidth`.
#[allow(clippy::cast_precision_loss)]
pub fn cluster_hotspots(
    points: &[(f64, f64)],
    eps: f64,
    min_samples: usize,
    bandwidth: f64,
) -> Result<Vec<HotspotCluster>, AnalyticsError> {
    let kde = GaussianKde::fit(points, bandwidth)?;
    let clusters = dbscan(points, eps, min_samples)?;

    let mut hotspots: Vec<HotspotCluster> = clusters
        .iter()
        .map(|members| {
            let n = members.len() as f64;
            let (sum_x, sum_y) = members.iter().fold((0.0, 0.0), |(sx, sy), &i| {
                (sx + points[i].0, sy + points[i].1)
            });
            let (lon, lat) = (sum_x / n, sum_y / n);

            HotspotCluster {
                lon,
                lat,
                incident_count: members.len() as u64,
                density: kde.density(lon, lat),
            }
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.density
            .total_cmp(&a.density)
            .then_with(|| b.incident_count.cmp(&a.incident_count))
    });

    log::info!(
        "Found {} hotspot clusters among {} incidents",
        hotspots.len(),
        points.len()
    );

    Ok(hotspots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(cx: f64, cy: f64, n: usize) -> Vec<(f64, f64)> {
        (0..n)
            .map(|i| {
                let offset = f64::from(u32::try_from(i).unwrap()) * 0.0001;
                (cx + offset, cy - offset)
            })
            .collect()
    }

    #[test]
    fn separates_blobs_and_noise() {
        let mut points = blob(0.0, 0.0, 6);
        points.extend(blob(1.0, 1.0, 8));
        points.push((5.0, 5.0));

        let clusters = dbscan(&points, 0.01, 3).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0], (0..6).collect::<Vec<_>>());
        assert_eq!(clusters[1], (6..14).collect::<Vec<_>>());
        assert!(
            !clusters.iter().flatten().any(|&i| i == 14),
            "isolated point is noise"
        );
    }

    #[test]
    fn min_samples_counts_the_point_itself() {
        let points = vec![(0.0, 0.0), (0.001, 0.0)];
        assert_eq!(dbscan(&points, 0.01, 2).unwrap().len(), 1);
        assert!(dbscan(&points, 0.01, 3).unwrap().is_empty());
    }

    #[test]
    fn hotspots_sorted_by_density() {
        let mut points = blob(0.0, 0.0, 5);
        points.extend(blob(1.0, 1.0, 12));

        let hotspots = cluster_hotspots(&points, 0.01, 3, 0.01).unwrap();
        assert_eq!(hotspots.len(), 2);
        assert_eq!(hotspots[0].incident_count, 12);
        assert_eq!(hotspots[1].incident_count, 5);
        assert!(hotspots[0].density >= hotspots[1].density);
        assert!((hotspots[1].lon - 0.0002).abs() < 1e-9);
        assert!((hotspots[1].lat - -0.0002).abs() < 1e-9);
    }

    #[test]
    fn dense_cluster_queues_each_point_once() {
        let n = 3000;
        let points = vec![(0.0, 0.0); n];
        let all = || (0..n).collect::<Vec<usize>>();

        let mut scan = ScanState::new(n);
        scan.visited[0] = true;
        let (members, queued) = scan.expand(0, &all(), |_| all(), 5);
        assert_eq!(members.len(), n);
        assert!(queued < n, "queued {queued} entries for {n} points");

        let clusters = dbscan(&points, 0.01, 5).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), n);
    }

    #[test]
    fn border_points_join_the_first_cluster_that_reaches_them() {
        // Chain of points 0.008 apart: ends are border points, middle is core.
        let points = vec![(0.0, 0.0), (0.008, 0.0), (0.016, 0.0), (0.5, 0.5)];
        let clusters = dbscan(&points, 0.01, 3).unwrap();
        assert_eq!(clusters, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn no_points_no_clusters() {
        assert!(cluster_hotspots(&[], 0.01, 3, 0.01).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(dbscan(&[(0.0, 0.0)], 0.0, 3).is_err());
        assert!(dbscan(&[(0.0, 0.0)], 0.1, 0).is_err());
    }
}
