//! # building-heights
//!
//! Enrichissement d'emprises de bâtiments par une série temporelle de hauteurs,
//! tuile par tuile.
//!
//! ## Features
//!
//! - Découpage d'une région en tuiles
//! - Jointure spatiale observations raster → bâtiments (R-tree)
//! - Hauteur moyenne/max, confiance et volume par bâtiment et par date
//! - Fusion des tables par tuile et découpage par un polygone de référence
//! - Surfaces en UTM local (pure Rust), repli PROJ hors bande UTM
//!
//! ## Usage CLI
//!
//! ```bash
//! # Liste des tuiles de la région
//! building-heights tiles
//!
//! # Traitement de toutes les tuiles, 8 threads
//! building-heights run --jobs 8 --report report.json
//!
//! # Fusion puis découpage
//! building-heights combine
//! building-heights clip --boundary data/thane.geojson
//! ```

pub mod batch;
pub mod clip;
pub mod combine;
pub mod config;
pub mod dataset;
pub mod enrich;
pub mod export;
pub mod grid;
pub mod model;
pub mod providers;
pub mod report;
#[cfg(feature = "reproject")]
pub mod reproject;
pub mod reproject_lite;

pub use config::PipelineConfig;
pub use enrich::{EmptyReason, TileEnricher, TileOutcome, TileSummary};
pub use grid::generate_tiles;
pub use model::{Building, Footprint, TimestampLabel, TimestampMetrics};
pub use report::{BatchReport, BatchStatus};
