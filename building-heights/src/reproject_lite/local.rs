//! Projection métrique locale d'une tuile, pour le calcul des surfaces
//!
//! Zone UTM du centre de la tuile en Rust pur; hors de la bande UTM, projection
//! azimutale équivalente de Lambert via PROJ (feature `reproject`).

use anyhow::Result;
use geo::{Area, Geometry};
use height_raster::BBox;

use super::{UtmProjection, UtmZone};

/// Projection vers un système métrique adapté à une tuile
pub enum LocalProjector {
    Utm(UtmProjection),
    #[cfg(feature = "reproject")]
    EqualArea(crate::reproject::Reprojector),
}

impl LocalProjector {
    /// Choisit la projection d'après le centre de la tuile
    pub fn for_tile(tile: &BBox) -> Result<Self> {
        let (lon, lat) = tile.center();

        if let Some(zone) = UtmZone::for_point(lon, lat) {
            return Ok(Self::Utm(UtmProjection::forward(zone)));
        }

        #[cfg(feature = "reproject")]
        {
            let proj = crate::reproject::Reprojector::local_equal_area(lon, lat)?;
            Ok(Self::EqualArea(proj))
        }

        #[cfg(not(feature = "reproject"))]
        anyhow::bail!(
            "Tile {} is outside the UTM band (80°S-84°N); build with --features reproject",
            tile
        )
    }

    /// Géométrie WGS84 → coordonnées métriques
    pub fn project(&self, geometry: &Geometry) -> Result<Geometry> {
        match self {
            Self::Utm(utm) => utm.project(geometry),
            #[cfg(feature = "reproject")]
            Self::EqualArea(proj) => proj.transform_geometry(geometry),
        }
    }

    /// Surface en m² d'une géométrie WGS84
    pub fn area_m2(&self, geometry: &Geometry) -> Result<f64> {
        Ok(self.project(geometry)?.unsigned_area())
    }

    /// Système cible, pour les logs
    pub fn describe(&self) -> String {
        match self {
            Self::Utm(utm) => format!("EPSG:{}", utm.zone().epsg()),
            #[cfg(feature = "reproject")]
            Self::EqualArea(proj) => proj.target().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_thane_tile_uses_utm_43n() {
        let tile = BBox::new(72.93, 19.15, 72.95, 19.17).unwrap();
        let projector = LocalProjector::for_tile(&tile).unwrap();
        assert_eq!(projector.describe(), "EPSG:32643");
    }

    #[test]
    fn test_southern_tile() {
        let tile = BBox::new(55.44, -20.9, 55.46, -20.88).unwrap();
        let projector = LocalProjector::for_tile(&tile).unwrap();
        assert_eq!(projector.describe(), "EPSG:32740");
    }

    #[test]
    fn test_area_m2() {
        let tile = BBox::new(72.98, 19.24, 73.0, 19.26).unwrap();
        let projector = LocalProjector::for_tile(&tile).unwrap();
        let square = Geometry::Polygon(polygon![
            (x: 72.980, y: 19.240),
            (x: 72.981, y: 19.240),
            (x: 72.981, y: 19.241),
            (x: 72.980, y: 19.241),
            (x: 72.980, y: 19.240),
        ]);
        let area = projector.area_m2(&square).unwrap();
        assert!(area > 11_500.0 && area < 11_800.0, "area={}", area);
    }

    #[cfg(feature = "reproject")]
    #[test]
    fn test_polar_tile_falls_back_to_equal_area() {
        let tile = BBox::new(10.0, 85.0, 10.02, 85.02).unwrap();
        let projector = LocalProjector::for_tile(&tile).unwrap();
        assert!(projector.describe().starts_with("+proj=laea"));
    }
}
