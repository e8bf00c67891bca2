//! Découpage d'une emprise en tuiles de taille fixe
//!
//! Les tuiles partent du coin (ouest, sud), colonne par colonne: pour chaque pas
//! en x, toutes les lignes en y sont émises avant de passer à la colonne
//! suivante. La dernière ligne/colonne est tronquée pour coller exactement à
//! l'emprise.

use std::path::Path;

use anyhow::{Context, Result};
use height_raster::BBox;
use serde::{Deserialize, Serialize};

/// Tolérance sur le nombre de pas, pour absorber l'erreur d'arrondi de `span / cell`
const STEP_EPSILON: f64 = 1e-9;

/// Génère les tuiles couvrant `bounds`.
///
/// Emprise dégénérée ou `cell_size` non positive → aucune tuile.
pub fn generate_tiles(bounds: &BBox, cell_size: f64) -> Vec<BBox> {
    if !bounds.is_valid() || !cell_size.is_finite() || cell_size <= 0.0 {
        return Vec::new();
    }

    let xs = edges(bounds.minx, bounds.maxx, cell_size);
    let ys = edges(bounds.miny, bounds.maxy, cell_size);

    let mut tiles = Vec::with_capacity((xs.len() - 1) * (ys.len() - 1));
    for x in xs.windows(2) {
        for y in ys.windows(2) {
            tiles.push(BBox {
                minx: x[0],
                miny: y[0],
                maxx: x[1],
                maxy: y[1],
            });
        }
    }
    tiles
}

/// Bords des cellules sur un axe: `min + i * cell`, le dernier vaut `max`.
///
/// Les positions sont calculées (pas accumulées) pour que deux tuiles voisines
/// partagent exactement la même valeur de bord.
fn edges(min: f64, max: f64, cell: f64) -> Vec<f64> {
    let steps = (((max - min) / cell) - STEP_EPSILON).ceil().max(1.0) as usize;

    let mut edges: Vec<f64> = (0..steps).map(|i| min + cell * i as f64).collect();
    edges.push(max);
    edges
}

/// Ligne du fichier de tuiles (`minx,miny,maxx,maxy`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TileRecord {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl From<BBox> for TileRecord {
    fn from(b: BBox) -> Self {
        Self {
            minx: b.minx,
            miny: b.miny,
            maxx: b.maxx,
            maxy: b.maxy,
        }
    }
}

impl TryFrom<TileRecord> for BBox {
    type Error = height_raster::RasterError;

    fn try_from(r: TileRecord) -> Result<Self, Self::Error> {
        BBox::new(r.minx, r.miny, r.maxx, r.maxy)
    }
}

/// Écrit la liste des tuiles en CSV
pub fn write_tiles(tiles: &[BBox], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create tile list {}", path.display()))?;
    for tile in tiles {
        writer.serialize(TileRecord::from(*tile))?;
    }
    writer.flush()?;
    Ok(())
}

/// Lit une liste de tuiles CSV (colonnes `minx, miny, maxx, maxy`)
pub fn read_tiles(path: &Path) -> Result<Vec<BBox>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open tile list {}", path.display()))?;

    reader
        .deserialize::<TileRecord>()
        .enumerate()
        .map(|(i, record)| {
            let record = record.with_context(|| format!("Invalid tile row {}", i + 1))?;
            BBox::try_from(record).with_context(|| format!("Invalid tile bounds at row {}", i + 1))
        })
        .collect()
}
