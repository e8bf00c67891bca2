//! Enrichissement d'une tuile
//!
//! Pour une tuile:
//! 1. emprises de bâtiments du fournisseur, surface en UTM local
//! 2. dates disponibles dans la série raster
//! 3. par date: vignettes présence/hauteur → observations → agrégation
//! 4. une seule écriture de la table enrichie
//!
//! Toute erreur interne est journalisée et convertie en
//! [`TileOutcome::Failed`]; elle ne remonte jamais à l'appelant.

pub mod aggregate;
pub mod table;

pub use aggregate::aggregate;
pub use table::EnrichedTable;

use std::collections::HashSet;
use std::fmt;

use anyhow::{Context, Result};
use chrono::Utc;
use height_raster::BBox;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::export::{self, TileSink};
use crate::model::{round_to, Building, Footprint, TimestampLabel};
use crate::providers::{FootprintProvider, RasterProvider};
use crate::reproject_lite::LocalProjector;

/// Raison d'une tuile sans résultat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmptyReason {
    /// Aucun bâtiment dans la tuile
    NoBuildings,
    /// Aucune date raster sur la tuile
    NoTimestamps,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBuildings => f.write_str("no buildings"),
            Self::NoTimestamps => f.write_str("no timestamps"),
        }
    }
}

/// Résumé d'une tuile traitée
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileSummary {
    /// Nombre de lignes (bâtiments) de la table
    pub rows: usize,
    /// Nombre de dates fusionnées
    pub timestamps: usize,
    /// Emplacement écrit, `None` si l'écriture a échoué
    pub location: Option<String>,
}

impl TileSummary {
    pub fn saved(&self) -> bool {
        self.location.is_some()
    }
}

/// Résultat du traitement d'une tuile
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    Success(TileSummary),
    Empty(EmptyReason),
    Failed(String),
}

/// Orchestrateur du traitement d'une tuile
pub struct TileEnricher<'a> {
    config: &'a PipelineConfig,
    footprints: &'a dyn FootprintProvider,
    raster: &'a dyn RasterProvider,
    sink: &'a dyn TileSink,
    grid_id: String,
}

impl<'a> TileEnricher<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        footprints: &'a dyn FootprintProvider,
        raster: &'a dyn RasterProvider,
        sink: &'a dyn TileSink,
    ) -> Self {
        Self {
            config,
            footprints,
            raster,
            sink,
            grid_id: config.grid_id(),
        }
    }

    /// Traite une tuile. Ne panique pas et ne propage pas d'erreur.
    pub fn process(&self, tile: &BBox) -> TileOutcome {
        match self.try_process(tile) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(tile = %tile, error = ?e, "Error processing tile");
                TileOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    fn try_process(&self, tile: &BBox) -> Result<TileOutcome> {
        info!(tile = %tile, "Processing tile");

        let footprints = self
            .footprints
            .fetch(tile, self.config.footprints.min_zoom)
            .context("Failed to fetch building footprints")?;
        if footprints.is_empty() {
            info!(tile = %tile, "No buildings found in tile");
            return Ok(TileOutcome::Empty(EmptyReason::NoBuildings));
        }
        info!(tile = %tile, buildings = footprints.len(), "Found buildings");

        let buildings = compute_areas(tile, footprints)?;

        let timestamps = self
            .raster
            .timestamps(tile)
            .context("Failed to list raster timestamps")?;
        let timestamps = distinct_labels(&timestamps)?;
        if timestamps.is_empty() {
            info!(tile = %tile, "No timestamps available for tile");
            return Ok(TileOutcome::Empty(EmptyReason::NoTimestamps));
        }
        info!(tile = %tile, timestamps = timestamps.len(), "Found timestamps for tile");

        let mut table = EnrichedTable::new(buildings);
        for (millis, label) in timestamps {
            self.merge_timestamp(tile, &mut table, millis, label)?;
        }

        let bytes = export::tile_to_csv(&table, tile, Utc::now())?;
        let key = export::tile_key(tile, &self.grid_id);
        let location = match self.sink.put(&key, &bytes) {
            Ok(location) => {
                info!(tile = %tile, path = %location, rows = table.len(), "Saved tile data");
                Some(location)
            }
            Err(e) => {
                error!(
                    tile = %tile,
                    path = %self.sink.location(&key),
                    error = ?e,
                    "Failed to save tile data"
                );
                None
            }
        };

        Ok(TileOutcome::Success(TileSummary {
            rows: table.len(),
            timestamps: table.timestamps().len(),
            location,
        }))
    }

    /// Échantillonne une date et fusionne ses métriques dans la table
    fn merge_timestamp(
        &self,
        tile: &BBox,
        table: &mut EnrichedTable,
        millis: i64,
        label: TimestampLabel,
    ) -> Result<()> {
        info!(tile = %tile, timestamp = %label, "Processing timestamp");
        let sampling = &self.config.sampling;

        let presence = self
            .raster
            .fetch_band(tile, millis, &sampling.presence_band, sampling.width, sampling.height)
            .with_context(|| format!("Failed to fetch presence band for {}", label))?;
        let height = self
            .raster
            .fetch_band(tile, millis, &sampling.height_band, sampling.width, sampling.height)
            .with_context(|| format!("Failed to fetch height band for {}", label))?;

        let observations =
            height_raster::sample(tile, &presence, &height, sampling.presence_threshold)
                .with_context(|| format!("Failed to sample rasters for {}", label))?;

        let metrics = aggregate(table.buildings(), &observations, self.config.join.max_distance);
        debug!(
            timestamp = %label,
            observations = observations.len(),
            matched = metrics.len(),
            "Timestamp aggregated"
        );
        if observations.is_empty() {
            info!(tile = %tile, timestamp = %label, "No observations above presence threshold");
        }

        table.merge_timestamp(label, metrics);
        Ok(())
    }
}

/// Surface de chaque emprise dans la zone UTM du centre de la tuile
fn compute_areas(tile: &BBox, footprints: Vec<Footprint>) -> Result<Vec<Building>> {
    let projector = LocalProjector::for_tile(tile)?;
    debug!(tile = %tile, projection = %projector.describe(), "Area projection");

    footprints
        .into_iter()
        .map(|f| {
            let area = projector
                .area_m2(&f.geometry)
                .with_context(|| format!("Failed to project building {}", f.id))?;
            Ok(Building {
                area_m2: round_to(area, 2),
                id: f.id,
                geometry: f.geometry,
            })
        })
        .collect()
}

/// Dates distinctes dans l'ordre de découverte, avec leur libellé `YYYYMM`.
///
/// Deux dates du même mois: la première est gardée.
fn distinct_labels(timestamps: &[i64]) -> Result<Vec<(i64, TimestampLabel)>> {
    let mut seen_millis = HashSet::new();
    let mut seen_labels = HashSet::new();
    let mut labels = Vec::new();

    for &millis in timestamps {
        if !seen_millis.insert(millis) {
            continue;
        }
        let label = TimestampLabel::from_millis(millis)?;
        if !seen_labels.insert(label.clone()) {
            warn!(timestamp = millis, label = %label, "Duplicate timestamp label, skipping");
            continue;
        }
        labels.push((millis, label));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};

    #[test]
    fn test_distinct_labels() {
        // 2023-01-01, doublon exact, 2023-01-15 (même mois), 2023-02-01
        let ts = [
            1_672_531_200_000,
            1_672_531_200_000,
            1_673_740_800_000,
            1_675_209_600_000,
        ];
        let labels = distinct_labels(&ts).unwrap();
        let names: Vec<&str> = labels.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(names, vec!["202301", "202302"]);
        assert_eq!(labels[0].0, 1_672_531_200_000);
    }

    #[test]
    fn test_compute_areas() {
        let tile = BBox::new(72.98, 19.24, 73.0, 19.26).unwrap();
        let footprints = vec![Footprint {
            id: "a".into(),
            geometry: Geometry::Polygon(polygon![
                (x: 72.980, y: 19.240),
                (x: 72.981, y: 19.240),
                (x: 72.981, y: 19.241),
                (x: 72.980, y: 19.241),
                (x: 72.980, y: 19.240),
            ]),
        }];

        let buildings = compute_areas(&tile, footprints).unwrap();
        let area = buildings[0].area_m2;
        assert!(area > 11_500.0 && area < 11_800.0, "area={}", area);
        assert_eq!(area, round_to(area, 2));
    }

    #[test]
    fn test_empty_reason_display() {
        assert_eq!(EmptyReason::NoBuildings.to_string(), "no buildings");
        assert_eq!(EmptyReason::NoTimestamps.to_string(), "no timestamps");
    }
}
