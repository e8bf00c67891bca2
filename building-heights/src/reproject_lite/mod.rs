//! Projection UTM en Rust pur pour le calcul des surfaces
//!
//! WGS84 (EPSG:4326) → UTM nord (EPSG:326xx) / sud (EPSG:327xx).

mod ellipsoid;
mod local;
mod utm;

pub use local::LocalProjector;
pub use utm::UtmZone;

use anyhow::Result;
use geo::{Coord, Geometry, MapCoords};

/// Coordonnées géographiques en radians
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    pub lon: f64,
    pub lat: f64,
}

impl Geographic {
    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        Self {
            lon: lon.to_radians(),
            lat: lat.to_radians(),
        }
    }
}

/// Projection WGS84 → UTM d'une zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmProjection {
    zone: UtmZone,
}

impl UtmProjection {
    pub fn forward(zone: UtmZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    /// (lon, lat) en degrés → (x, y) en mètres
    pub fn project_point(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        utm::geographic_to_utm(Geographic::from_degrees(lon, lat), self.zone)
    }

    pub fn project(&self, geometry: &Geometry) -> Result<Geometry> {
        geometry.try_map_coords(|c| {
            let (x, y) = self.project_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}
