//! Projection UTM (Universal Transverse Mercator)
//!
//! Formules de Snyder (USGS PP 1395), précision millimétrique dans la zone.
//! Zones 1 à 60, nord (EPSG:326xx) et sud (EPSG:327xx), sans les exceptions
//! norvégiennes (32V, 31X-37X).

use super::ellipsoid::WGS84;
use super::Geographic;
use anyhow::{bail, Result};

/// Facteur d'échelle au méridien central
const K0: f64 = 0.9996;
/// False easting
const X0: f64 = 500000.0;
/// False northing de l'hémisphère sud
const Y0_SOUTH: f64 = 10000000.0;

/// Bande de latitude couverte par UTM (degrés)
pub const MIN_LAT: f64 = -80.0;
pub const MAX_LAT: f64 = 84.0;

/// Zone UTM d'un point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    pub zone: u32,
    pub south: bool,
}

impl UtmZone {
    /// Zone contenant le point (lon, lat) en degrés, `None` hors bande UTM
    pub fn for_point(lon_deg: f64, lat_deg: f64) -> Option<Self> {
        if !lon_deg.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&lat_deg) {
            return None;
        }
        let lon = (lon_deg + 180.0).rem_euclid(360.0);
        let zone = ((lon / 6.0).floor() as u32 + 1).min(60);
        Some(Self {
            zone,
            south: lat_deg < 0.0,
        })
    }

    pub fn epsg(&self) -> u32 {
        if self.south {
            32700 + self.zone
        } else {
            32600 + self.zone
        }
    }

    /// Longitude du méridien central (radians)
    fn central_meridian(&self) -> f64 {
        ((self.zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
    }
}

/// Longueur de l'arc de méridien depuis l'équateur
fn meridian_arc(phi: f64) -> f64 {
    let e2 = WGS84::E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    WGS84::A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Convertit des coordonnées géographiques WGS84 vers UTM (mètres)
pub fn geographic_to_utm(geo: Geographic, zone: UtmZone) -> Result<(f64, f64)> {
    let lat_deg = geo.lat.to_degrees();
    if !(MIN_LAT..=MAX_LAT).contains(&lat_deg) {
        bail!("Latitude {:.4} hors de la bande UTM", lat_deg);
    }

    let ep2 = WGS84::EP2;
    let phi = geo.lat;
    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let tan_phi = phi.tan();

    let n = WGS84::A / (1.0 - WGS84::E2 * sin_phi.powi(2)).sqrt();
    let t = tan_phi.powi(2);
    let c = ep2 * cos_phi.powi(2);
    let a = cos_phi * (geo.lon - zone.central_meridian());
    let m = meridian_arc(phi);

    let x = K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t.powi(2) + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + X0;

    let mut y = K0
        * (m + n
            * tan_phi
            * (a.powi(2) / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c.powi(2)) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t.powi(2) + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));

    if zone.south {
        y += Y0_SOUTH;
    }

    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_for_point() {
        // Thane
        let zone = UtmZone::for_point(72.98, 19.24).unwrap();
        assert_eq!(zone, UtmZone { zone: 43, south: false });
        assert_eq!(zone.epsg(), 32643);

        // Saint-Denis (Réunion)
        assert_eq!(UtmZone::for_point(55.45, -20.88).unwrap().epsg(), 32740);

        // Bords
        assert_eq!(UtmZone::for_point(-180.0, 0.0).unwrap().zone, 1);
        assert_eq!(UtmZone::for_point(180.0, 0.0).unwrap().zone, 1);
        assert_eq!(UtmZone::for_point(179.99, 0.0).unwrap().zone, 60);

        // Hors bande
        assert!(UtmZone::for_point(10.0, 85.0).is_none());
        assert!(UtmZone::for_point(10.0, -81.0).is_none());
    }

    #[test]
    fn test_central_meridian_on_equator() {
        // Méridien central de la zone 31 (3°E) sur l'équateur
        let zone = UtmZone { zone: 31, south: false };
        let (x, y) = geographic_to_utm(Geographic::from_degrees(3.0, 0.0), zone).unwrap();
        assert!((x - 500000.0).abs() < 1e-6, "x={}", x);
        assert!(y.abs() < 1e-6, "y={}", y);
    }

    #[test]
    fn test_southern_false_northing() {
        // Saint-Denis (Réunion)
        let zone = UtmZone { zone: 40, south: true };
        let (x, y) = geographic_to_utm(Geographic::from_degrees(55.45, -20.88), zone).unwrap();
        assert!(x > 300_000.0 && x < 700_000.0, "x={}", x);
        assert!(y > 7_000_000.0 && y < 8_000_000.0, "y={}", y);
    }

    #[test]
    fn test_outside_band() {
        let zone = UtmZone { zone: 33, south: false };
        assert!(geographic_to_utm(Geographic::from_degrees(15.0, 86.0), zone).is_err());
    }
}
