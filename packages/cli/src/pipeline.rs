//! Pipeline steps shared by every subcommand.
//!
//! Chains clean -> join -> score -> hotspots -> area density, reading
//! incident CSVs and writing the CSV and `GeoJSON` artifacts.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Instant;

use crime_hotspots_analytics::export::{
    write_area_density_csv, write_area_severity_csv, write_grid_geojson, write_hotspots_geojson,
};
use crime_hotspots_analytics::severity::SEVERITY_COLUMN;
use crime_hotspots_analytics::{
    HotspotSurface, area_severity_totals, cluster_hotspots, compare_area_density,
    estimate_hotspots, rank_by_severity, score_column,
};
use crime_hotspots_config::HotspotConfig;
use crime_hotspots_crime_models::IncidentTable;
use crime_hotspots_geography::BoundaryCache;
use crime_hotspots_geography_models::{AreaDensityRow, Crs, HotspotCluster};
use crime_hotspots_spatial::{filter_to_bounds, join_within, to_point_layer};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Configuration plus the process-wide boundary cache.
pub struct Pipeline {
    config: HotspotConfig,
    boundaries: BoundaryCache,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: HotspotConfig) -> Self {
        let boundaries = BoundaryCache::new(config.boundaries.to_map());
        Self { config, boundaries }
    }

    /// Reads an incident CSV and keeps rows inside the configured bounds.
    pub fn load_incidents(&self, path: &Path) -> Result<IncidentTable> {
        let file = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let raw = IncidentTable::from_csv_reader(BufReader::new(file))?;

        let columns = &self.config.columns;
        let cleaned = filter_to_bounds(&raw, &columns.x, &columns.y, &self.config.bounds)?;
        log::info!(
            "Loaded {} incidents from {} ({} inside bounds)",
            raw.len(),
            path.display(),
            cleaned.len()
        );
        Ok(cleaned)
    }

    /// Attributes incidents to the named boundary layer.
    pub fn join(&self, incidents: &IncidentTable, boundary: &str) -> Result<IncidentTable> {
        let layer = self.boundaries.get(boundary)?;
        let columns = &self.config.columns;
        let points = to_point_layer(incidents, &columns.x, &columns.y, Crs::WGS84)?;
        Ok(join_within(&points, &layer)?)
    }

    /// Appends severity and orders rows most severe first.
    pub fn score(&self, incidents: &IncidentTable) -> Result<(IncidentTable, Vec<f64>)> {
        let weights = self.config.severity.weight_table()?;
        let scores = score_column(incidents, &self.config.columns.code, Some(&weights))?;
        let ranked = rank_by_severity(incidents, &scores)?;
        Ok((ranked, scores))
    }

    /// Density surface and cluster centroids for the incidents.
    pub fn hotspots(
        &self,
        incidents: &IncidentTable,
    ) -> Result<(Vec<HotspotCluster>, HotspotSurface)> {
        let columns = &self.config.columns;
        let points = to_point_layer(incidents, &columns.x, &columns.y, Crs::WGS84)?;
        let coords = points.coordinates();
        let params = &self.config.hotspots;

        let surface = estimate_hotspots(&coords, params.bandwidth, params.grid_size, params.top_k)?;
        let clusters = cluster_hotspots(
            &coords,
            params.cluster_eps,
            params.min_samples,
            params.bandwidth,
        )?;
        Ok((clusters, surface))
    }

    /// Joins and compares density across the named layer's areas.
    pub fn area_density(
        &self,
        incidents: &IncidentTable,
        boundary: &str,
    ) -> Result<Vec<AreaDensityRow>> {
        let joined = self.join(incidents, boundary)?;
        let layer = self.boundaries.get(boundary)?;
        let columns = &self.config.columns;
        Ok(compare_area_density(
            &joined,
            layer.kind.key_column(),
            &columns.x,
            &columns.y,
        )?)
    }

    /// Runs every step and writes all artifacts into `output_dir`.
    pub fn run(&self, input: &Path, output_dir: &Path) -> Result<()> {
        let start = Instant::now();
        std::fs::create_dir_all(output_dir)?;

        let incidents = self.load_incidents(input)?;

        let by_district = self.join(&incidents, "district")?;
        let joined = {
            let by_tract = self.join(&incidents, "tract")?;
            let tract = by_tract
                .rows()
                .iter()
                .map(|row| row.get("tract_geoid").cloned().unwrap_or_default())
                .collect();
            by_district.with_column("tract_geoid", tract)?
        };
        joined.to_csv_writer(create(output_dir, "incidents_joined.csv")?)?;

        let (ranked, scores) = self.score(&joined)?;
        ranked.to_csv_writer(create(output_dir, "incidents_by_severity.csv")?)?;
        log::debug!("Wrote {SEVERITY_COLUMN} ranking for {} rows", ranked.len());

        let severity = area_severity_totals(&joined, "district", &scores)?;
        write_area_severity_csv(&severity, create(output_dir, "district_severity.csv")?)?;

        let (clusters, surface) = self.hotspots(&incidents)?;
        write_hotspots_geojson(&clusters, create(output_dir, "hotspots.geojson")?)?;
        write_grid_geojson(&surface.hotspots, create(output_dir, "density_peaks.geojson")?)?;

        let columns = &self.config.columns;
        for (area_column, name) in [("district", "district"), ("tract_geoid", "tract")] {
            let rows = compare_area_density(&joined, area_column, &columns.x, &columns.y)?;
            write_area_density_csv(&rows, create(output_dir, &format!("{name}_density.csv"))?)?;
        }

        log::info!(
            "Pipeline complete: {} incidents, {} hotspots in {:.1}s",
            incidents.len(),
            clusters.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

/// Creates `dir/name` for buffered writing.
pub fn create(dir: &Path, name: &str) -> Result<BufWriter<File>> {
    let path = dir.join(name);
    let file = File::create(&path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const DISTRICTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"DIST_NUMC": "12"},
            "geometry": {"type": "Polygon", "coordinates": [[
                [-75.20, 39.90], [-75.00, 39.90], [-75.00, 40.00], [-75.20, 40.00], [-75.20, 39.90]
            ]]}
        }]
    }"#;

    const TRACTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"GEOID": "42101000100", "POP100": 2500},
            "geometry": {"type": "Polygon", "coordinates": [[
                [-75.20, 39.90], [-75.10, 39.90], [-75.10, 40.00], [-75.20, 40.00], [-75.20, 39.90]
            ]]}
        }]
    }"#;

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("crime_hotspots_cli_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("districts.geojson"), DISTRICTS).unwrap();
        std::fs::write(dir.join("tracts.geojson"), TRACTS).unwrap();

        let mut csv = String::from("objectid,dispatch_date_time,point_x,point_y,ucr_general\n");
        for i in 0..8_i32 {
            let offset = f64::from(i) * 0.0002;
            csv.push_str(&format!(
                "{i},2024-01-0{}T12:00:00Z,{},{},{}\n",
                i % 9 + 1,
                -75.15 + offset,
                39.95 + offset,
                if i % 2 == 0 { 100 } else { 600 }
            ));
        }
        csv.push_str("8,,-75.05,39.95,300\n");
        csv.push_str("9,,-80.00,39.95,300\n");
        csv.push_str("10,,,39.95,300\n");
        std::fs::write(dir.join("incidents.csv"), csv).unwrap();
        dir
    }

    fn pipeline(dir: &Path) -> Pipeline {
        let mut config = HotspotConfig::default_config();
        config.boundaries.district = dir.join("districts.geojson");
        config.boundaries.tract = dir.join("tracts.geojson");
        config.hotspots.grid_size = 10;
        config.hotspots.min_samples = 3;
        Pipeline::new(config)
    }

    #[test]
    fn load_drops_out_of_bounds_rows() {
        let dir = fixture_dir("load");
        let incidents = pipeline(&dir).load_incidents(&dir.join("incidents.csv")).unwrap();
        assert_eq!(incidents.len(), 9);
    }

    #[test]
    fn join_keeps_every_row() {
        let dir = fixture_dir("join");
        let pipeline = pipeline(&dir);
        let incidents = pipeline.load_incidents(&dir.join("incidents.csv")).unwrap();

        let joined = pipeline.join(&incidents, "tract").unwrap();
        assert_eq!(joined.len(), incidents.len());
        let matched = joined
            .rows()
            .iter()
            .filter(|r| r.get("tract_geoid").is_some_and(|v| !v.is_null()))
            .count();
        assert_eq!(matched, 8);

        assert!(pipeline.join(&incidents, "county").is_err());
    }

    #[test]
    fn run_writes_every_artifact() {
        let dir = fixture_dir("run");
        let out = dir.join("out");
        pipeline(&dir).run(&dir.join("incidents.csv"), &out).unwrap();

        for name in [
            "incidents_joined.csv",
            "incidents_by_severity.csv",
            "district_severity.csv",
            "hotspots.geojson",
            "density_peaks.geojson",
            "district_density.csv",
            "tract_density.csv",
        ] {
            assert!(out.join(name).exists(), "{name} should be written");
        }

        let hotspots: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("hotspots.geojson")).unwrap())
                .unwrap();
        let features = hotspots["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"]["incident_count"], 8);

        let severity = std::fs::read_to_string(out.join("district_severity.csv")).unwrap();
        assert!(severity.lines().nth(1).unwrap().starts_with("12,9,"));
    }

    #[test]
    fn missing_boundary_file_is_reported() {
        let dir = fixture_dir("missing");
        let mut config = HotspotConfig::default_config();
        config.boundaries.district = dir.join("nope.geojson");
        let pipeline = Pipeline::new(config);
        let incidents = pipeline.load_incidents(&dir.join("incidents.csv")).unwrap();

        let err = pipeline.join(&incidents, "district").unwrap_err();
        assert!(err.to_string().contains("nope.geojson"));
    }
}
