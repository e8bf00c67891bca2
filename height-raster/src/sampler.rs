//! Échantillonnage d'une paire de rasters presence/height en observations ponctuelles
//!
//! Les coordonnées des cellules sont obtenues par interpolation linéaire entre
//! les coins de la tuile: la latitude décroît du bord nord (ligne 0) au bord sud
//! (dernière ligne), la longitude croît du bord ouest (colonne 0) au bord est.

use tracing::debug;

use crate::{BBox, Grid, HeightObservation, RasterError};

/// Seuil de présence par défaut: en dessous, la cellule n'est pas un bâtiment
pub const DEFAULT_PRESENCE_THRESHOLD: f64 = 0.6;

/// Convertit les grilles presence/height d'une tuile en observations de hauteur.
///
/// Seules les cellules avec `presence >= threshold` sont conservées (une valeur
/// NaN ne passe jamais le seuil). L'ordre de sortie est row-major. Un résultat
/// vide signifie "pas de données", pas une erreur.
///
/// # Errors
///
/// `InvalidBounds` si la tuile est dégénérée, `ShapeMismatch` si les deux
/// grilles n'ont pas la même forme.
pub fn sample(
    tile: &BBox,
    presence: &Grid,
    height: &Grid,
    threshold: f64,
) -> Result<Vec<HeightObservation>, RasterError> {
    if !tile.is_valid() {
        return Err(RasterError::InvalidBounds(tile.to_string()));
    }
    if presence.shape() != height.shape() {
        return Err(RasterError::ShapeMismatch {
            presence: presence.shape(),
            height: height.shape(),
        });
    }

    let (rows, cols) = presence.shape();
    let lats = linspace(tile.maxy, tile.miny, rows);
    let lngs = linspace(tile.minx, tile.maxx, cols);

    let observations: Vec<HeightObservation> = presence
        .values()
        .iter()
        .zip(height.values())
        .enumerate()
        .filter(|&(_, (&p, _))| p >= threshold)
        .map(|(idx, (_, &h))| HeightObservation {
            lat: lats[idx / cols],
            lng: lngs[idx % cols],
            height: h,
        })
        .collect();

    debug!(
        tile = %tile,
        rows,
        cols,
        kept = observations.len(),
        threshold,
        "Sampled raster"
    );

    Ok(observations)
}

/// `n` valeurs régulièrement espacées de `start` à `stop` inclus.
///
/// Une seule valeur donne `start`; la dernière vaut exactement `stop`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        stop
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile() -> BBox {
        BBox::new(72.93, 19.15, 72.95, 19.17).unwrap()
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 1.0, 3), vec![3.0, 2.0, 1.0]);
        assert_eq!(linspace(3.0, 1.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_row_zero_is_north_column_zero_is_west() {
        let mut cells = vec![0.0; 9];
        cells[0] = 0.9;
        cells[8] = 0.7;
        let presence = Grid::new(3, 3, cells).unwrap();
        let height = Grid::new(3, 3, (0..9).map(f64::from).collect()).unwrap();

        let obs = sample(&tile(), &presence, &height, DEFAULT_PRESENCE_THRESHOLD).unwrap();
        assert_eq!(obs.len(), 2);

        // Coin nord-ouest
        assert_eq!(obs[0].lat, 19.17);
        assert_eq!(obs[0].lng, 72.93);
        assert_eq!(obs[0].height, 0.0);

        // Coin sud-est
        assert_eq!(obs[1].lat, 19.15);
        assert_eq!(obs[1].lng, 72.95);
        assert_eq!(obs[1].height, 8.0);
    }

    #[test]
    fn test_count_matches_threshold() {
        let values: Vec<f64> = (0..64).map(|i| f64::from(i) / 63.0).collect();
        let presence = Grid::new(8, 8, values.clone()).unwrap();
        let height = Grid::filled(8, 8, 12.0);

        let expected = values.iter().filter(|&&v| v >= 0.6).count();
        let obs = sample(&tile(), &presence, &height, 0.6).unwrap();

        assert_eq!(obs.len(), expected);
        let bounds = tile();
        assert!(obs.iter().all(|o| bounds.contains(o.lng, o.lat)));
    }

    #[test]
    fn test_threshold_is_inclusive_and_nan_is_dropped() {
        let presence = Grid::new(1, 3, vec![0.6, f64::NAN, 0.59999]).unwrap();
        let height = Grid::filled(1, 3, 5.0);
        let obs = sample(&tile(), &presence, &height, 0.6).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].lng, 72.93);
    }

    #[test]
    fn test_no_cells_is_empty_not_error() {
        let presence = Grid::filled(4, 4, 0.1);
        let height = Grid::filled(4, 4, 30.0);
        let obs = sample(&tile(), &presence, &height, 0.6).unwrap();
        assert!(obs.is_empty());
    }

    #[test]
    fn test_shape_mismatch() {
        let presence = Grid::filled(4, 4, 1.0);
        let height = Grid::filled(4, 5, 1.0);
        assert!(matches!(
            sample(&tile(), &presence, &height, 0.6),
            Err(RasterError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_non_square_grid_mapping() {
        // 2 lignes x 3 colonnes
        let presence = Grid::filled(2, 3, 1.0);
        let height = Grid::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let bounds = BBox::new(0.0, 0.0, 2.0, 1.0).unwrap();
        let obs = sample(&bounds, &presence, &height, 0.6).unwrap();

        assert_eq!(obs.len(), 6);
        assert_eq!((obs[1].lng, obs[1].lat, obs[1].height), (1.0, 1.0, 2.0));
        assert_eq!((obs[5].lng, obs[5].lat, obs[5].height), (2.0, 0.0, 6.0));
    }
}
