//! Types de données pour le crate height-raster

use std::fmt;

use crate::RasterError;

/// Emprise géographique alignée sur les axes (degrés WGS84)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    /// Longitude ouest
    pub minx: f64,
    /// Latitude sud
    pub miny: f64,
    /// Longitude est
    pub maxx: f64,
    /// Latitude nord
    pub maxy: f64,
}

impl BBox {
    /// Crée une emprise validée (`minx < maxx`, `miny < maxy`, valeurs finies)
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Result<Self, RasterError> {
        let bbox = Self {
            minx,
            miny,
            maxx,
            maxy,
        };
        if !bbox.is_valid() {
            return Err(RasterError::InvalidBounds(bbox.to_string()));
        }
        Ok(bbox)
    }

    /// Vérifie l'invariant de l'emprise
    pub fn is_valid(&self) -> bool {
        [self.minx, self.miny, self.maxx, self.maxy]
            .iter()
            .all(|v| v.is_finite())
            && self.minx < self.maxx
            && self.miny < self.maxy
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// Centre de l'emprise (lng, lat)
    pub fn center(&self) -> (f64, f64) {
        (
            (self.minx + self.maxx) / 2.0,
            (self.miny + self.maxy) / 2.0,
        )
    }

    /// Test d'appartenance, bords inclus
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        lng >= self.minx && lng <= self.maxx && lat >= self.miny && lat <= self.maxy
    }

    /// Anneau fermé du polygone de l'emprise.
    ///
    /// Ordre: SW, NW, NE, SE, SW.
    pub fn ring(&self) -> [[f64; 2]; 5] {
        [
            [self.minx, self.miny],
            [self.minx, self.maxy],
            [self.maxx, self.maxy],
            [self.maxx, self.miny],
            [self.minx, self.miny],
        ]
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.minx, self.miny, self.maxx, self.maxy)
    }
}

/// Grille 2D de valeurs, stockée ligne par ligne (row-major).
///
/// La ligne 0 correspond au bord nord de la tuile, la colonne 0 au bord ouest.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Grid {
    /// Crée une grille à partir de données row-major
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, RasterError> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(RasterError::invalid_npy(format!(
                "{} values cannot fill a {}x{} grid",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Grille uniforme
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Forme (lignes, colonnes)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Valeurs aplaties, dans l'ordre row-major
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Observation de hauteur géolocalisée, issue d'une cellule du raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightObservation {
    /// Latitude (degrés)
    pub lat: f64,
    /// Longitude (degrés)
    pub lng: f64,
    /// Hauteur estimée (mètres)
    pub height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_validation() {
        assert!(BBox::new(72.93, 19.15, 72.95, 19.17).is_ok());
        assert!(BBox::new(1.0, 0.0, 1.0, 1.0).is_err());
        assert!(BBox::new(0.0, 2.0, 1.0, 1.0).is_err());
        assert!(BBox::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_bbox_display() {
        let bbox = BBox::new(72.93, 19.15, 72.95, 19.17).unwrap();
        assert_eq!(bbox.to_string(), "72.93,19.15,72.95,19.17");
    }

    #[test]
    fn test_bbox_ring_is_closed() {
        let bbox = BBox::new(0.0, 0.0, 1.0, 2.0).unwrap();
        let ring = bbox.ring();
        assert_eq!(ring[0], ring[4]);
        assert_eq!(ring[1], [0.0, 2.0]);
    }

    #[test]
    fn test_grid_shape_check() {
        assert!(Grid::new(2, 3, vec![0.0; 6]).is_ok());
        assert!(Grid::new(2, 3, vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_grid_values_row_major() {
        let grid = Grid::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(grid.shape(), (2, 3));
        assert_eq!(grid.values()[1], 2.0);
        assert_eq!(grid.values()[3], 4.0);
    }
}
