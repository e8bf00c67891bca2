//! Définition et implémentation des commandes CLI
//!
//! - `tiles`: liste des tuiles de la région
//! - `enrich`: une tuile (débogage)
//! - `run`: toutes les tuiles en parallèle, avec rapport
//! - `combine`: fusion des tables par tuile
//! - `clip`: découpage par le polygone de référence

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use height_raster::BBox;
use tracing::info;

use building_heights::batch;
use building_heights::clip;
use building_heights::combine;
use building_heights::export::FsSink;
use building_heights::grid;
use building_heights::providers::{HttpFootprintProvider, HttpRasterProvider};
use building_heights::{PipelineConfig, TileEnricher, TileOutcome};

/// Mètres par degré de latitude (approximation sphérique)
const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Subcommand)]
pub enum Commands {
    /// Write the tile list of the configured region
    Tiles {
        /// Output CSV (minx,miny,maxx,maxy)
        #[arg(short, long, default_value = "tiles.csv")]
        output: PathBuf,
    },

    /// Process a single tile
    Enrich {
        #[arg(long, allow_hyphen_values = true)]
        minx: f64,
        #[arg(long, allow_hyphen_values = true)]
        miny: f64,
        #[arg(long, allow_hyphen_values = true)]
        maxx: f64,
        #[arg(long, allow_hyphen_values = true)]
        maxy: f64,

        /// Output directory for tile tables (défaut: storage.output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Process every tile of the region (or of a tile list) in parallel
    Run {
        /// Tile list CSV (défaut: grille de la région)
        #[arg(long)]
        tiles: Option<PathBuf>,

        /// Number of tiles processed concurrently
        #[arg(long, alias = "threads")]
        jobs: Option<usize>,

        /// Save the batch report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output directory for tile tables (défaut: storage.output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Combine tile tables into a single CSV
    Combine {
        /// Directory holding tile tables (défaut: storage.output_dir)
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Combined CSV (défaut: storage.combined_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clip the combined CSV to the boundary polygon
    Clip {
        /// Combined CSV (défaut: storage.combined_path)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Boundary GeoJSON (défaut: storage.boundary_path)
        #[arg(long)]
        boundary: Option<PathBuf>,

        /// Final CSV (défaut: storage.final_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Journalise le rayon métrique effectif de `join.max_distance` au centre de la région.
///
/// La distance est exprimée en degrés: sa valeur en mètres varie avec la latitude.
pub fn log_join_radius(config: &PipelineConfig) {
    let (_, lat) = match config.region.bounds() {
        Ok(bounds) => bounds.center(),
        Err(_) => return,
    };
    let degrees = config.join.max_distance;
    info!(
        max_distance_deg = degrees,
        north_south_m = %format!("{:.1}", degrees * METERS_PER_DEGREE),
        east_west_m = %format!("{:.1}", degrees * METERS_PER_DEGREE * lat.to_radians().cos()),
        latitude = %format!("{:.2}", lat),
        "Join radius is expressed in degrees"
    );
}

/// Exécute la commande tiles
pub fn cmd_tiles(config: &PipelineConfig, output: &Path) -> Result<()> {
    let bounds = config.region.bounds()?;
    let tiles = grid::generate_tiles(&bounds, config.grid.cell_size);
    grid::write_tiles(&tiles, output)?;

    info!(
        region = %config.region.name,
        tiles = tiles.len(),
        output = %output.display(),
        "Tile list written"
    );
    println!("Generated {} tiles → {}", tiles.len(), output.display());
    Ok(())
}

/// Exécute la commande enrich sur une tuile
pub fn cmd_enrich(config: &PipelineConfig, tile: BBox, output_dir: Option<PathBuf>) -> Result<()> {
    let footprints = HttpFootprintProvider::new(&config.footprints)
        .context("Failed to configure footprint provider")?;
    let raster =
        HttpRasterProvider::new(&config.raster).context("Failed to configure raster provider")?;
    let sink = FsSink::new(output_dir.unwrap_or_else(|| config.storage.output_dir.clone()));

    let enricher = TileEnricher::new(config, &footprints, &raster, &sink);
    match enricher.process(&tile) {
        TileOutcome::Success(summary) => {
            match &summary.location {
                Some(location) => println!("Tile processed: {} rows → {}", summary.rows, location),
                None => println!("Tile processed: {} rows (not saved)", summary.rows),
            }
            Ok(())
        }
        TileOutcome::Empty(reason) => {
            println!("Tile empty: {}", reason);
            Ok(())
        }
        TileOutcome::Failed(message) => bail!("Tile failed: {}", message),
    }
}

/// Exécute la commande run
pub fn cmd_run(
    config: &PipelineConfig,
    tiles_path: Option<&Path>,
    jobs: Option<usize>,
    report_path: Option<&Path>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let tiles = match tiles_path {
        Some(path) => grid::read_tiles(path)?,
        None => grid::generate_tiles(&config.region.bounds()?, config.grid.cell_size),
    };
    if tiles.is_empty() {
        bail!("No tiles to process");
    }

    let footprints = HttpFootprintProvider::new(&config.footprints)
        .context("Failed to configure footprint provider")?;
    let raster =
        HttpRasterProvider::new(&config.raster).context("Failed to configure raster provider")?;
    let sink = FsSink::new(output_dir.unwrap_or_else(|| config.storage.output_dir.clone()));
    let enricher = TileEnricher::new(config, &footprints, &raster, &sink);

    let jobs = jobs.unwrap_or_else(rayon::current_num_threads);
    let report = batch::run_tiles(&tiles, &enricher, &config.grid_id(), jobs)?;
    report.display();

    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to save report to {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }
    Ok(())
}

/// Exécute la commande combine
pub fn cmd_combine(
    config: &PipelineConfig,
    input_dir: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let input_dir = input_dir.unwrap_or_else(|| config.storage.output_dir.clone());
    let output = output.unwrap_or_else(|| config.storage.combined_path.clone());

    let summary = combine::combine_dir(&input_dir, &output)?;

    println!(
        "Combined {}/{} files ({} skipped): {} rows, {} columns → {}",
        summary.files_read,
        summary.files_found,
        summary.skipped.len(),
        summary.rows,
        summary.columns,
        output.display()
    );
    Ok(())
}

/// Exécute la commande clip
pub fn cmd_clip(
    config: &PipelineConfig,
    input: Option<PathBuf>,
    boundary: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let input = input.unwrap_or_else(|| config.storage.combined_path.clone());
    let output = output.unwrap_or_else(|| config.storage.final_path.clone());
    let Some(boundary) = boundary.or_else(|| config.storage.boundary_path.clone()) else {
        bail!("No boundary given (use --boundary or storage.boundary_path)");
    };

    let summary = clip::clip_file(&input, &boundary, &output)?;
    println!(
        "Clipped {} → {} rows ({} truncated, {} invalid) → {}",
        summary.rows_in,
        summary.rows_out,
        summary.truncated,
        summary.invalid,
        output.display()
    );
    Ok(())
}
