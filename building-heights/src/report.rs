//! Rapport de traitement par lot
//!
//! Collecte le résultat de chaque tuile (succès, vide, échec) et en déduit un
//! statut global affiché en fin de traitement.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use height_raster::BBox;
use serde::Serialize;

use crate::enrich::{EmptyReason, TileOutcome};

/// Statut global du lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchStatus {
    /// Toutes les tuiles traitées sans erreur
    Success,
    /// Des tuiles en échec, d'autres réussies
    PartialSuccess,
    /// Aucune tuile réussie
    Failed,
}

/// Tuile en échec ou sans donnée
#[derive(Debug, Clone, Serialize)]
pub struct TileIssue {
    /// Bornes de la tuile (`minx,miny,maxx,maxy`)
    pub tile: String,
    pub message: String,
}

/// Rapport complet d'un lot de tuiles
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Identité de la grille
    pub grid_id: String,
    pub duration_secs: f64,
    pub status: BatchStatus,

    pub tiles_total: usize,
    pub tiles_succeeded: usize,
    pub tiles_empty: usize,
    pub tiles_failed: usize,
    /// Tuiles traitées mais non écrites
    pub save_failures: usize,
    /// Lignes écrites, toutes tuiles confondues
    pub buildings_saved: usize,

    pub empty: Vec<TileIssue>,
    pub errors: Vec<TileIssue>,
}

impl BatchReport {
    pub fn new(grid_id: &str) -> Self {
        Self {
            grid_id: grid_id.to_string(),
            duration_secs: 0.0,
            status: BatchStatus::Success,
            tiles_total: 0,
            tiles_succeeded: 0,
            tiles_empty: 0,
            tiles_failed: 0,
            save_failures: 0,
            buildings_saved: 0,
            empty: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Enregistre le résultat d'une tuile
    pub fn record(&mut self, tile: &BBox, outcome: &TileOutcome) {
        self.tiles_total += 1;
        match outcome {
            TileOutcome::Success(summary) if summary.saved() => {
                self.tiles_succeeded += 1;
                self.buildings_saved += summary.rows;
            }
            TileOutcome::Success(summary) => {
                self.save_failures += 1;
                self.errors.push(TileIssue {
                    tile: tile.to_string(),
                    message: format!("{} rows processed but not saved", summary.rows),
                });
            }
            TileOutcome::Empty(reason) => {
                self.tiles_empty += 1;
                self.empty.push(TileIssue {
                    tile: tile.to_string(),
                    message: reason.to_string(),
                });
            }
            TileOutcome::Failed(message) => {
                self.tiles_failed += 1;
                self.errors.push(TileIssue {
                    tile: tile.to_string(),
                    message: message.clone(),
                });
            }
        }
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    ///
    /// Une tuile vide n'est pas une erreur.
    pub fn finalize(&mut self) {
        let has_errors = !self.errors.is_empty();
        let has_success = self.tiles_succeeded > 0 || self.tiles_empty > 0;

        self.status = if has_errors && has_success {
            BatchStatus::PartialSuccess
        } else if has_errors {
            BatchStatus::Failed
        } else {
            BatchStatus::Success
        };
    }

    /// Nombre de tuiles vides pour une raison donnée
    pub fn empty_count(&self, reason: EmptyReason) -> usize {
        let label = reason.to_string();
        self.empty.iter().filter(|e| e.message == label).count()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("BATCH REPORT - Grid {}", self.grid_id);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Tiles: {} total, {} saved, {} empty, {} failed, {} not saved",
            self.tiles_total,
            self.tiles_succeeded,
            self.tiles_empty,
            self.tiles_failed,
            self.save_failures
        );
        println!("Buildings saved: {}", self.buildings_saved);

        if !self.empty.is_empty() {
            println!(
                "\n--- EMPTY TILES ({}: {} without buildings, {} without timestamps) ---",
                self.empty.len(),
                self.empty_count(EmptyReason::NoBuildings),
                self.empty_count(EmptyReason::NoTimestamps)
            );
            for e in self.empty.iter().take(10) {
                println!("  [{}] {}", e.tile, e.message);
            }
            if self.empty.len() > 10 {
                println!("  ... and {} more", self.empty.len() - 10);
            }
        }

        if !self.errors.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.errors.len());
            for e in self.errors.iter().take(20) {
                println!("  [{}] {}", e.tile, e.message);
            }
            if self.errors.len() > 20 {
                println!("  ... and {} more", self.errors.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} tiles saved, {} empty, {} errors, {} buildings",
            self.grid_id,
            self.tiles_succeeded,
            self.tiles_total,
            self.tiles_empty,
            self.errors.len(),
            self.buildings_saved
        )
    }
}
