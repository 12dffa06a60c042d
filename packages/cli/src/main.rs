#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crime hotspot pipeline.
//!
//! Each subcommand runs one step over an incident CSV; `run` chains all of
//! them. Configuration comes from `--config`, then `CRIME_HOTSPOTS_CONFIG`,
//! then the embedded defaults.

mod pipeline;

use std::fs::File;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crime_hotspots_analytics::export::{
    write_area_density_csv, write_grid_geojson, write_hotspots_geojson,
};
use crime_hotspots_config::{HotspotConfig, load_from_env};

use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "crime_hotspots_cli", about = "Crime incident hotspot analysis")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attribute incidents to the polygons of a boundary layer
    Join {
        /// Incident CSV
        #[arg(long)]
        input: PathBuf,
        /// Boundary layer name ("district" or "tract")
        #[arg(long)]
        boundary: String,
        /// Joined CSV to write
        #[arg(long)]
        output: PathBuf,
    },
    /// Score incidents by offense severity, most severe first
    Score {
        /// Incident CSV
        #[arg(long)]
        input: PathBuf,
        /// Ranked CSV to write
        #[arg(long)]
        output: PathBuf,
    },
    /// Cluster incidents into hotspots and export them as `GeoJSON`
    Hotspots {
        /// Incident CSV
        #[arg(long)]
        input: PathBuf,
        /// Hotspot centroids `GeoJSON` to write
        #[arg(long)]
        output: PathBuf,
        /// Optional `GeoJSON` of the densest grid cells
        #[arg(long)]
        grid_output: Option<PathBuf>,
    },
    /// Compare incident density across the areas of a boundary layer
    AreaDensity {
        /// Incident CSV
        #[arg(long)]
        input: PathBuf,
        /// Boundary layer name ("district" or "tract")
        #[arg(long)]
        boundary: String,
        /// Density CSV to write
        #[arg(long)]
        output: PathBuf,
    },
    /// Run every step and write all artifacts to a directory
    Run {
        /// Incident CSV
        #[arg(long)]
        input: PathBuf,
        /// Directory for the outputs
        #[arg(long)]
        output_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => HotspotConfig::load(path)?,
        None => load_from_env()?,
    };
    let pipeline = Pipeline::new(config);

    match cli.command {
        Commands::Join {
            input,
            boundary,
            output,
        } => {
            let incidents = pipeline.load_incidents(&input)?;
            let joined = pipeline.join(&incidents, &boundary)?;
            joined.to_csv_writer(File::create(&output)?)?;
            log::info!("Wrote {} joined rows to {}", joined.len(), output.display());
        }
        Commands::Score { input, output } => {
            let incidents = pipeline.load_incidents(&input)?;
            let (ranked, _) = pipeline.score(&incidents)?;
            ranked.to_csv_writer(File::create(&output)?)?;
            log::info!("Wrote {} scored rows to {}", ranked.len(), output.display());
        }
        Commands::Hotspots {
            input,
            output,
            grid_output,
        } => {
            let incidents = pipeline.load_incidents(&input)?;
            let (clusters, surface) = pipeline.hotspots(&incidents)?;
            write_hotspots_geojson(&clusters, File::create(&output)?)?;
            if let Some(grid_output) = grid_output {
                write_grid_geojson(&surface.hotspots, File::create(&grid_output)?)?;
            }
        }
        Commands::AreaDensity {
            input,
            boundary,
            output,
        } => {
            let incidents = pipeline.load_incidents(&input)?;
            let rows = pipeline.area_density(&incidents, &boundary)?;
            write_area_density_csv(&rows, File::create(&output)?)?;
            log::info!("Wrote {} area rows to {}", rows.len(), output.display());
        }
        Commands::Run { input, output_dir } => {
            pipeline.run(&input, &output_dir)?;
        }
    }

    Ok(())
}
