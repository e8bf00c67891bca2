//! Jointure spatiale observations → bâtiments et statistiques de hauteur
//!
//! Chaque bâtiment reçoit les observations situées à distance minimale de sa
//! géométrie (0 pour un point intérieur), dans la limite de `max_distance`
//! (degrés). Toutes les observations ex aequo sont retenues.

use std::collections::BTreeMap;

use geo::{BoundingRect, EuclideanDistance, Geometry, Point};
use height_raster::HeightObservation;
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};
use tracing::debug;

use crate::model::{round_to, Building, TimestampMetrics};

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Distance point → géométrie surfacique, `None` pour les autres types
fn distance_to(geometry: &Geometry, point: &Point) -> Option<f64> {
    match geometry {
        Geometry::Polygon(p) => Some(point.euclidean_distance(p)),
        Geometry::MultiPolygon(mp) => Some(point.euclidean_distance(mp)),
        _ => None,
    }
}

/// Hauteurs des observations retenues pour un bâtiment
fn nearest_heights(
    building: &Building,
    tree: &RTree<IndexedPoint>,
    observations: &[HeightObservation],
    max_distance: f64,
) -> Vec<f64> {
    let Some(rect) = building.geometry.bounding_rect() else {
        return Vec::new();
    };
    let envelope = AABB::from_corners(
        [rect.min().x - max_distance, rect.min().y - max_distance],
        [rect.max().x + max_distance, rect.max().y + max_distance],
    );

    let mut best = f64::INFINITY;
    let mut heights = Vec::new();
    for candidate in tree.locate_in_envelope(&envelope) {
        let obs = &observations[candidate.data];
        let Some(distance) = distance_to(&building.geometry, &Point::new(obs.lng, obs.lat)) else {
            continue;
        };
        if distance > max_distance {
            continue;
        }
        if distance < best {
            best = distance;
            heights.clear();
            heights.push(obs.height);
        } else if distance == best {
            heights.push(obs.height);
        }
    }
    heights
}

/// Agrège les observations d'une date sur les bâtiments.
///
/// Les bâtiments sans observation jointe (ou dont toutes les hauteurs sont non
/// finies) sont absents du résultat.
pub fn aggregate(
    buildings: &[Building],
    observations: &[HeightObservation],
    max_distance: f64,
) -> BTreeMap<String, TimestampMetrics> {
    let mut result = BTreeMap::new();
    if buildings.is_empty() || observations.is_empty() {
        return result;
    }

    let tree = RTree::bulk_load(
        observations
            .iter()
            .enumerate()
            .map(|(i, o)| GeomWithData::new([o.lng, o.lat], i))
            .collect(),
    );

    // (hauteur moyenne arrondie, max, nombre) par bâtiment
    let mut stats: Vec<(&Building, f64, f64, usize)> = Vec::new();
    for building in buildings {
        let heights: Vec<f64> = nearest_heights(building, &tree, observations, max_distance)
            .into_iter()
            .filter(|h| h.is_finite())
            .collect();
        if heights.is_empty() {
            continue;
        }

        let count = heights.len();
        let mean = heights.iter().sum::<f64>() / count as f64;
        let max = heights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        stats.push((building, round_to(mean, 2), round_to(max, 2), count));
    }

    let max_count = stats.iter().map(|s| s.3).max().unwrap_or(0);
    for (building, mean, max, count) in stats {
        result.insert(
            building.id.clone(),
            TimestampMetrics {
                height_mean: mean,
                height_max: max,
                points_count: count,
                height_confidence: round_to(count as f64 / max_count as f64, 3),
                volume_m3: round_to(building.area_m2 * mean, 2),
            },
        );
    }

    debug!(
        buildings = buildings.len(),
        observations = observations.len(),
        matched = result.len(),
        "Aggregated observations"
    );
    result
}
