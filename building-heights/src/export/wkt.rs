//! Conversion géométrie ↔ WKT via geozero

use anyhow::{Context, Result};
use geo::Geometry;
use geozero::wkt::{Wkt, WktWriter};
use geozero::{GeozeroGeometry, ToGeo};

/// Encode une géométrie en WKT
pub fn to_wkt(geometry: &Geometry) -> Result<String> {
    let mut buf = Vec::new();
    {
        let mut writer = WktWriter::new(&mut buf);
        geometry
            .process_geom(&mut writer)
            .context("Failed to encode geometry to WKT")?;
    }
    String::from_utf8(buf).context("WKT writer produced invalid UTF-8")
}

/// Décode une géométrie WKT
pub fn from_wkt(text: &str) -> Result<Geometry> {
    Wkt(text)
        .to_geo()
        .with_context(|| format!("Invalid WKT: {:.60}", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    #[test]
    fn test_polygon_wkt() {
        let square = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]);

        let text = to_wkt(&square).unwrap();
        assert!(text.starts_with("POLYGON"), "{}", text);

        let parsed = from_wkt(&text).unwrap();
        assert_eq!(parsed.unsigned_area(), 4.0);
    }

    #[test]
    fn test_invalid_wkt() {
        assert!(from_wkt("POLYGON((0 0, 1").is_err());
        assert!(from_wkt("").is_err());
    }
}
