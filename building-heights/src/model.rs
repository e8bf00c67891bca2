//! Types métier: bâtiments, libellés temporels, métriques par date

use std::fmt;

use anyhow::{anyhow, Result};
use chrono::DateTime;
use geo::Geometry;

/// Emprise de bâtiment renvoyée par le fournisseur
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    /// Identifiant stable du bâtiment
    pub id: String,
    /// Polygone en WGS84
    pub geometry: Geometry,
}

/// Bâtiment avec sa surface calculée dans une projection métrique locale
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub id: String,
    pub geometry: Geometry,
    /// Surface au sol en m², arrondie à 2 décimales
    pub area_m2: f64,
}

/// Libellé mensuel d'une date du raster (`YYYYMM`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimestampLabel(String);

impl TimestampLabel {
    /// Libellé depuis un timestamp en millisecondes (UTC)
    pub fn from_millis(millis: i64) -> Result<Self> {
        let date = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| anyhow!("Timestamp out of range: {}", millis))?;
        Ok(Self(date.format("%Y%m").to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimestampLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Métriques d'un bâtiment pour une date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampMetrics {
    /// Hauteur moyenne (m), 2 décimales
    pub height_mean: f64,
    /// Hauteur maximale (m), 2 décimales
    pub height_max: f64,
    /// Nombre d'observations jointes
    pub points_count: usize,
    /// `points_count / max(points_count)` sur la date, 3 décimales
    pub height_confidence: f64,
    /// `area_m2 * height_mean`, 2 décimales
    pub volume_m3: f64,
}

/// Arrondi à `decimals` décimales
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
