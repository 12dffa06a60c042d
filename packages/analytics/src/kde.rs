//! Gaussian kernel density surface and its peak cells.

use std::f64::consts::PI;

use crime_hotspots_geography_models::HotspotCell;

use crate::AnalyticsError;

/// Isotropic 2-D Gaussian kernel density model.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    points: Vec<(f64, f64)>,
    bandwidth: f64,
    log_norm: f64,
}

impl GaussianKde {
    /// Fits the model to `points`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidParameter`] if `bandwidth` is not a
    /// positive finite number.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(points: &[(f64, f64)], bandwidth: f64) -> Result<Self, AnalyticsError> {
        check_bandwidth(bandwidth)?;

        let n = points.len().max(1) as f64;
        let log_norm = -(n.ln() + (2.0 * PI * bandwidth * bandwidth).ln());

        Ok(Self {
            points: points.to_vec(),
            bandwidth,
            log_norm,
        })
    }

    /// Log of the density at `(x, y)`. `-inf` when the model has no points.
    #[must_use]
    pub fn log_density(&self, x: f64, y: f64) -> f64 {
        let scale = 2.0 * self.bandwidth * self.bandwidth;
        let exponents = self.points.iter().map(|&(px, py)| {
            let dx = x - px;
            let dy = y - py;
            -(dx * dx + dy * dy) / scale
        });

        log_sum_exp(exponents) + self.log_norm
    }

    /// Density at `(x, y)`. Never negative.
    #[must_use]
    pub fn density(&self, x: f64, y: f64) -> f64 {
        self.log_density(x, y).exp()
    }

    /// Kernel bandwidth.
    #[must_use]
    pub const fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Number of fitted points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the model was fitted to no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn log_sum_exp(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.map(|v| (v - max).exp()).sum::<f64>().ln()
}

fn check_bandwidth(bandwidth: f64) -> Result<(), AnalyticsError> {
    if bandwidth.is_finite() && bandwidth > 0.0 {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidParameter {
            message: format!("bandwidth must be positive, got {bandwidth}"),
        })
    }
}

/// `n` evenly spaced values from `min` to `max` inclusive. A single value
/// is `min`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { max } else { step.mul_add(i as f64, min) })
                .collect()
        }
    }
}

/// Regular grid of density values.
///
/// Cells are stored row-major: latitude index outer, longitude index inner.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    /// Grid longitudes, ascending.
    pub lons: Vec<f64>,
    /// Grid latitudes, ascending.
    pub lats: Vec<f64>,
    /// One cell per (lat, lon) pair in scan order.
    pub cells: Vec<HotspotCell>,
}

impl DensityGrid {
    /// Evaluates `kde` on an `n` by `n` grid spanning the inclusive bounding
    /// box of `points`.
    #[must_use]
    pub fn evaluate(kde: &GaussianKde, points: &[(f64, f64)], n: usize) -> Self {
        let (min_lon, max_lon, min_lat, max_lat) = points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(a, b, c, d), &(x, y)| (a.min(x), b.max(x), c.min(y), d.max(y)),
        );

        let lons = linspace(min_lon, max_lon, n);
        let lats = linspace(min_lat, max_lat, n);

        let cells = lats
            .iter()
            .flat_map(|&lat| {
                lons.iter().map(move |&lon| HotspotCell {
                    lon,
                    lat,
                    density: kde.density(lon, lat),
                })
            })
            .collect();

        Self { lons, lats, cells }
    }

    /// Returns the `k` densest cells, densest first. Equal densities keep
    /// scan order.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<HotspotCell> {
        let mut cells = self.cells.clone();
        cells.sort_by(|a, b| b.density.total_cmp(&a.density));
        cells.truncate(k);
        cells
    }
}

/// Full density grid plus its peak cells.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotSurface {
    /// Every evaluated cell.
    pub grid: DensityGrid,
    /// Densest cells, densest first.
    pub hotspots: Vec<HotspotCell>,
}

/// Fits a Gaussian KDE to `points` and returns the `grid_size` by
/// `grid_size` surface with its `top_k` peaks.
///
/// With no points the surface is empty. Coincident points produce a grid
/// whose cells all sit on the same coordinate.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] for a non-positive
/// bandwidth or a zero grid size.
pub fn estimate_hotspots(
    points: &[(f64, f64)],
    bandwidth: f64,
    grid_size: usize,
    top_k: usize,
) -> Result<HotspotSurface, AnalyticsError> {
    if grid_size == 0 {
        return Err(AnalyticsError::InvalidParameter {
            message: "grid size must be at least 1".to_string(),
        });
    }
    let kde = GaussianKde::fit(points, bandwidth)?;

    if points.is_empty() {
        log::warn!("No located incidents; density surface is empty");
        return Ok(HotspotSurface {
            grid: DensityGrid {
                lons: Vec::new(),
                lats: Vec::new(),
                cells: Vec::new(),
            },
            hotspots: Vec::new(),
        });
    }

    log::info!(
        "Evaluating density of {} points on a {grid_size}x{grid_size} grid",
        points.len()
    );
    let grid = DensityGrid::evaluate(&kde, points, grid_size);
    let hotspots = grid.top_k(top_k);
    log::debug!(
        "Peak density {}",
        hotspots.first().map_or(0.0, |c| c.density)
    );

    Ok(HotspotSurface { grid, hotspots })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<(f64, f64)> {
        vec![
            (-75.16, 39.95),
            (-75.161, 39.951),
            (-75.159, 39.949),
            (-75.10, 40.00),
            (-75.20, 39.90),
        ]
    }

    #[test]
    fn grid_has_n_squared_cells() {
        let surface = estimate_hotspots(&sample(), 0.01, 7, 10).unwrap();
        assert_eq!(surface.grid.cells.len(), 49);
        assert_eq!(surface.hotspots.len(), 10);
    }

    #[test]
    fn grid_spans_inclusive_bounds_in_scan_order() {
        let surface = estimate_hotspots(&sample(), 0.01, 3, 1).unwrap();
        let cells = &surface.grid.cells;
        assert!((cells[0].lon - -75.20).abs() < 1e-12);
        assert!((cells[0].lat - 39.90).abs() < 1e-12);
        assert!((cells[1].lat - 39.90).abs() < 1e-12, "longitude varies fastest");
        assert!((cells[8].lon - -75.10).abs() < 1e-12);
        assert!((cells[8].lat - 40.00).abs() < 1e-12);
    }

    #[test]
    fn top_k_is_non_increasing() {
        let surface = estimate_hotspots(&sample(), 0.01, 20, 15).unwrap();
        assert!(
            surface
                .hotspots
                .windows(2)
                .all(|w| w[0].density >= w[1].density),
            "peaks must be sorted densest first"
        );
        assert!(surface.grid.cells.iter().all(|c| c.density >= 0.0));
    }

    #[test]
    fn deterministic() {
        let a = estimate_hotspots(&sample(), 0.02, 10, 5).unwrap();
        let b = estimate_hotspots(&sample(), 0.02, 10, 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn equal_densities_keep_scan_order() {
        let surface = estimate_hotspots(&[(0.0, 0.0), (1.0, 0.0)], 0.5, 2, 4).unwrap();
        // Mirror-image points: every cell has the same density.
        let lons: Vec<f64> = surface.hotspots.iter().map(|c| c.lon).collect();
        let lats: Vec<f64> = surface.hotspots.iter().map(|c| c.lat).collect();
        assert_eq!(lons, vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(lats, vec![0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn coincident_points_give_degenerate_grid() {
        let points = vec![(-75.1, 39.95); 4];
        let surface = estimate_hotspots(&points, 0.01, 5, 3).unwrap();
        assert_eq!(surface.grid.cells.len(), 25);
        let first = surface.grid.cells[0];
        assert!(first.density.is_finite() && first.density > 0.0);
        assert!(surface.grid.cells.iter().all(|c| c == &first));
    }

    #[test]
    fn single_point_and_empty_input() {
        let single = estimate_hotspots(&[(1.0, 2.0)], 0.1, 4, 2).unwrap();
        assert_eq!(single.grid.cells.len(), 16);
        assert_eq!(single.hotspots.len(), 2);

        let empty = estimate_hotspots(&[], 0.1, 4, 2).unwrap();
        assert!(empty.grid.cells.is_empty());
        assert!(empty.hotspots.is_empty());
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(
            estimate_hotspots(&sample(), 0.0, 10, 5),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
        assert!(matches!(
            estimate_hotspots(&sample(), 0.01, 0, 5),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn density_matches_closed_form_for_one_point() {
        let kde = GaussianKde::fit(&[(0.0, 0.0)], 1.0).unwrap();
        let expected = 1.0 / (2.0 * PI);
        assert!((kde.density(0.0, 0.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn linspace_edges() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
