//! Traitement local d'une liste de tuiles en parallèle

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use height_raster::BBox;
use rayon::prelude::*;
use tracing::info;

use crate::enrich::{TileEnricher, TileOutcome};
use crate::report::BatchReport;

/// Fréquence des logs de progression
const PROGRESS_EVERY: usize = 10;

/// Traite toutes les tuiles avec `jobs` threads et collecte le rapport.
///
/// Chaque tuile est indépendante; un échec n'interrompt pas les autres.
pub fn run_tiles(
    tiles: &[BBox],
    enricher: &TileEnricher<'_>,
    grid_id: &str,
    jobs: usize,
) -> Result<BatchReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to build worker pool")?;

    info!(tiles = tiles.len(), jobs = jobs.max(1), "Starting batch");
    let started = Instant::now();
    let processed = AtomicUsize::new(0);

    let outcomes: Vec<(BBox, TileOutcome)> = pool.install(|| {
        tiles
            .par_iter()
            .map(|tile| {
                let outcome = enricher.process(tile);
                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % PROGRESS_EVERY == 0 || done == tiles.len() {
                    info!(processed = done, total = tiles.len(), "Batch progress");
                }
                (*tile, outcome)
            })
            .collect()
    });

    let mut report = BatchReport::new(grid_id);
    for (tile, outcome) in &outcomes {
        report.record(tile, outcome);
    }
    report.set_duration(started.elapsed());
    report.finalize();

    info!(summary = %report.summary(), "Batch complete");
    Ok(report)
}
