//! Découpage de la table combinée par un polygone de référence
//!
//! - ligne sans intersection avec la limite → supprimée
//! - géométrie entièrement à l'intérieur → gardée telle quelle
//! - géométrie à cheval → remplacée par son intersection avec la limite

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use geo::{
    BooleanOps, Geometry, GeometryCollection, Intersects, LineString, MultiLineString,
    MultiPoint, MultiPolygon, Relate,
};
use geojson::GeoJson;
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Table;
use crate::export::wkt;

/// Bilan du découpage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClipSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    /// Géométries tronquées à la limite
    pub truncated: usize,
    /// Lignes dont la géométrie est illisible
    pub invalid: usize,
}

/// Lit la limite depuis un GeoJSON (FeatureCollection, Feature ou géométrie).
///
/// Tous les polygones sont fusionnés.
pub fn read_boundary(path: &Path) -> Result<MultiPolygon> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read boundary {}", path.display()))?;
    parse_boundary(&content).with_context(|| format!("Invalid boundary {}", path.display()))
}

pub fn parse_boundary(content: &str) -> Result<MultiPolygon> {
    let geometries: Vec<geojson::Geometry> = match GeoJson::from_str(content)? {
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().filter_map(|f| f.geometry).collect(),
        GeoJson::Feature(f) => f.geometry.into_iter().collect(),
        GeoJson::Geometry(g) => vec![g],
    };

    let mut polygons = Vec::new();
    for geometry in geometries {
        collect_polygons(Geometry::<f64>::try_from(geometry)?, &mut polygons);
    }
    if polygons.is_empty() {
        bail!("Boundary contains no polygon");
    }

    let boundary = polygons
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, p| {
            acc.union(&MultiPolygon::new(vec![p]))
        });
    Ok(boundary)
}

fn collect_polygons(geometry: Geometry, out: &mut Vec<geo::Polygon>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp.0),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

/// Résultat polygonal: `None` si vide, `POLYGON` si une seule partie
fn polygonal(result: MultiPolygon) -> Option<Geometry> {
    use geo::Area;

    let mut parts: Vec<_> = result.0.into_iter().filter(|p| p.unsigned_area() > 0.0).collect();
    match parts.len() {
        0 => None,
        1 => parts.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(MultiPolygon::new(parts))),
    }
}

fn lineal(result: MultiLineString) -> Option<Geometry> {
    let mut parts: Vec<LineString> = result.0.into_iter().filter(|l| l.0.len() > 1).collect();
    match parts.len() {
        0 => None,
        1 => parts.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(MultiLineString::new(parts))),
    }
}

/// Découpe une géométrie par la limite, `None` si elle est hors limite
pub fn clip_geometry(geometry: &Geometry, boundary: &MultiPolygon) -> Option<Geometry> {
    match geometry {
        Geometry::Polygon(p) => {
            let relation = p.relate(boundary);
            if !relation.is_intersects() {
                None
            } else if relation.is_within() {
                Some(geometry.clone())
            } else {
                polygonal(MultiPolygon::new(vec![p.clone()]).intersection(boundary))
            }
        }
        Geometry::MultiPolygon(mp) => {
            let relation = mp.relate(boundary);
            if !relation.is_intersects() {
                None
            } else if relation.is_within() {
                Some(geometry.clone())
            } else {
                polygonal(mp.intersection(boundary))
            }
        }
        Geometry::Point(p) => boundary.intersects(p).then(|| geometry.clone()),
        Geometry::MultiPoint(mp) => {
            let kept: Vec<_> = mp.iter().filter(|p| boundary.intersects(*p)).copied().collect();
            match kept.len() {
                0 => None,
                n if n == mp.0.len() => Some(geometry.clone()),
                _ => Some(Geometry::MultiPoint(MultiPoint::new(kept))),
            }
        }
        Geometry::LineString(ls) => {
            lineal(boundary.clip(&MultiLineString::new(vec![ls.clone()]), false))
        }
        Geometry::MultiLineString(mls) => lineal(boundary.clip(mls, false)),
        Geometry::Line(l) => clip_geometry(&Geometry::LineString(LineString::from(*l)), boundary),
        Geometry::Rect(r) => clip_geometry(&Geometry::Polygon(r.to_polygon()), boundary),
        Geometry::Triangle(t) => clip_geometry(&Geometry::Polygon(t.to_polygon()), boundary),
        Geometry::GeometryCollection(gc) => {
            let parts: Vec<Geometry> = gc.iter().filter_map(|g| clip_geometry(g, boundary)).collect();
            (!parts.is_empty()).then(|| Geometry::GeometryCollection(GeometryCollection(parts)))
        }
    }
}

/// Découpe les lignes d'une table selon leur colonne `geometry` (WKT)
pub fn clip_table(table: &Table, boundary: &MultiPolygon) -> Result<(Table, ClipSummary)> {
    let Some(geometry_col) = table.column_index("geometry") else {
        bail!("Table has no geometry column");
    };

    let mut summary = ClipSummary {
        rows_in: table.len(),
        ..Default::default()
    };
    let mut clipped = Table::new(table.columns().to_vec());

    for row in table.rows() {
        let geometry = match wkt::from_wkt(&row[geometry_col]) {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Dropping row with unreadable geometry");
                summary.invalid += 1;
                continue;
            }
        };

        let Some(result) = clip_geometry(&geometry, boundary) else {
            continue;
        };

        let mut row = row.clone();
        if result != geometry {
            row[geometry_col] = wkt::to_wkt(&result)?;
            summary.truncated += 1;
        }
        clipped.push_row(row)?;
    }

    summary.rows_out = clipped.len();
    Ok((clipped, summary))
}

/// Découpe un fichier CSV et écrit le résultat
pub fn clip_file(input: &Path, boundary_path: &Path, output: &Path) -> Result<ClipSummary> {
    let table = Table::read_csv(input)?;
    let boundary = read_boundary(boundary_path)?;
    info!(
        input = %input.display(),
        rows = table.len(),
        boundary_parts = boundary.0.len(),
        "Clipping dataset"
    );

    let (clipped, summary) = clip_table(&table, &boundary)?;
    clipped.write_csv(output)?;

    info!(
        output = %output.display(),
        rows_in = summary.rows_in,
        rows_out = summary.rows_out,
        truncated = summary.truncated,
        invalid = summary.invalid,
        "Clipped dataset written"
    );
    Ok(summary)
}
