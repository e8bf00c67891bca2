//! Sérialisation et stockage des tables enrichies

pub mod storage;
pub mod wkt;

pub use storage::{tile_key, FsSink, TileSink, TILE_FILE_PREFIX};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use height_raster::BBox;

use crate::enrich::table::{metric_values, EnrichedTable, METRIC_NAMES};

/// En-tête de la table d'une tuile
pub fn tile_columns(table: &EnrichedTable) -> Vec<String> {
    let mut columns = vec!["id".to_string(), "area_m2".to_string()];
    columns.extend(table.metric_columns());
    columns.extend(["geometry", "tile_bounds", "processed_at"].map(String::from));
    columns
}

/// Aplatit la table en CSV: une ligne par bâtiment, cinq colonnes par date.
///
/// Les métriques absentes sont écrites vides.
pub fn tile_to_csv(
    table: &EnrichedTable,
    tile: &BBox,
    processed_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let tile_bounds = tile.to_string();
    let processed_at = processed_at.to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(tile_columns(table))?;

    for (index, building) in table.buildings().iter().enumerate() {
        let mut record = Vec::with_capacity(5 + METRIC_NAMES.len() * table.timestamps().len());
        record.push(building.id.clone());
        record.push(building.area_m2.to_string());

        for label in table.timestamps() {
            match table.metrics(index, label) {
                Some(m) => record.extend(metric_values(m)),
                None => record.extend(std::iter::repeat(String::new()).take(METRIC_NAMES.len())),
            }
        }

        record.push(
            wkt::to_wkt(&building.geometry)
                .with_context(|| format!("Building {}", building.id))?,
        );
        record.push(tile_bounds.clone());
        record.push(processed_at.clone());
        writer.write_record(&record)?;
    }

    writer.into_inner().context("Failed to flush CSV buffer")
}
