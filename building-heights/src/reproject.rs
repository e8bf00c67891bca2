//! Reprojection de géométries avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`. Il prend le
//! relais de reproject_lite pour les tuiles hors de la bande UTM (régions
//! polaires).

use anyhow::{Context, Result};
use geo::{Coord, Geometry, MapCoords};
use proj::Proj;

/// Reprojection de géométries WGS84 vers un système métrique local
pub struct Reprojector {
    proj: Proj,
    target: String,
}

impl Reprojector {
    /// Projection azimutale équivalente de Lambert centrée sur (lon, lat).
    ///
    /// Les surfaces y sont exactes quelle que soit la latitude.
    pub fn local_equal_area(lon: f64, lat: f64) -> Result<Self> {
        let target = format!(
            "+proj=laea +lat_0={} +lon_0={} +datum=WGS84 +units=m +no_defs",
            lat, lon
        );

        let proj = Proj::new_known_crs("EPSG:4326", &target, None)
            .context(format!("Failed to create projection to {}", target))?;

        Ok(Self { proj, target })
    }

    /// Définition du système cible
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        geom.try_map_coords(|c| {
            let (x, y) = self
                .proj
                .convert((c.x, c.y))
                .context("Coordinate transformation failed")?;
            Ok(Coord { x, y })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    #[test]
    fn test_polar_equal_area() {
        // Carré de 0.01° à 85°N, hors bande UTM
        let reprojector = Reprojector::local_equal_area(15.6, 85.0).unwrap();
        assert!(reprojector.target().contains("+proj=laea"));

        let square = Geometry::Polygon(polygon![
            (x: 15.60, y: 85.00),
            (x: 15.61, y: 85.00),
            (x: 15.61, y: 85.01),
            (x: 15.60, y: 85.01),
            (x: 15.60, y: 85.00),
        ]);
        let area = reprojector.transform_geometry(&square).unwrap().unsigned_area();

        // ~97 m x ~1116 m
        assert!(area > 100_000.0 && area < 120_000.0, "area={}", area);
    }
}
