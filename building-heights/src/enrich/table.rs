//! Table enrichie d'une tuile
//!
//! Un enregistrement par bâtiment, avec une entrée `label → métriques` par date
//! fusionnée. L'aplatissement en colonnes `<métrique>_<YYYYMM>` n'a lieu qu'à
//! l'écriture (voir [`crate::export`]).

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use crate::model::{Building, TimestampLabel, TimestampMetrics};

/// Métriques écrites pour chaque date, dans l'ordre des colonnes
pub const METRIC_NAMES: [&str; 5] = [
    "height_mean",
    "height_max",
    "points_count",
    "height_confidence",
    "volume_m3",
];

/// Bâtiments d'une tuile et leurs métriques par date
#[derive(Debug, Clone, Default)]
pub struct EnrichedTable {
    buildings: Vec<Building>,
    metrics: Vec<HashMap<TimestampLabel, TimestampMetrics>>,
    timestamps: Vec<TimestampLabel>,
}

impl EnrichedTable {
    /// Table de base. Un identifiant en double n'est gardé qu'une fois.
    pub fn new(buildings: Vec<Building>) -> Self {
        let total = buildings.len();
        let mut seen = HashSet::with_capacity(total);
        let buildings: Vec<Building> = buildings
            .into_iter()
            .filter(|b| seen.insert(b.id.clone()))
            .collect();

        if buildings.len() < total {
            warn!(
                duplicates = total - buildings.len(),
                "Duplicate building ids dropped"
            );
        }

        let metrics = vec![HashMap::new(); buildings.len()];
        Self {
            buildings,
            metrics,
            timestamps: Vec::new(),
        }
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Dates fusionnées, dans l'ordre de fusion
    pub fn timestamps(&self) -> &[TimestampLabel] {
        &self.timestamps
    }

    pub fn has_timestamp(&self, label: &TimestampLabel) -> bool {
        self.timestamps.contains(label)
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// Jointure à gauche des métriques d'une date sur les bâtiments.
    ///
    /// Retourne le nombre de bâtiments renseignés. Une date déjà fusionnée est
    /// ignorée.
    pub fn merge_timestamp(
        &mut self,
        label: TimestampLabel,
        metrics: BTreeMap<String, TimestampMetrics>,
    ) -> usize {
        if self.has_timestamp(&label) {
            warn!(timestamp = %label, "Timestamp already merged, skipping");
            return 0;
        }

        let mut matched = 0;
        for (building, slot) in self.buildings.iter().zip(self.metrics.iter_mut()) {
            if let Some(m) = metrics.get(&building.id) {
                slot.insert(label.clone(), *m);
                matched += 1;
            }
        }
        self.timestamps.push(label);
        matched
    }

    /// Métriques d'un bâtiment (par index) pour une date
    pub fn metrics(&self, index: usize, label: &TimestampLabel) -> Option<&TimestampMetrics> {
        self.metrics.get(index).and_then(|m| m.get(label))
    }

    /// Noms des colonnes de métriques, date par date
    pub fn metric_columns(&self) -> Vec<String> {
        self.timestamps
            .iter()
            .flat_map(|label| METRIC_NAMES.iter().map(move |m| format!("{}_{}", m, label)))
            .collect()
    }
}

/// Valeurs d'une métrique dans l'ordre de [`METRIC_NAMES`]
pub fn metric_values(m: &TimestampMetrics) -> [String; 5] {
    [
        m.height_mean.to_string(),
        m.height_max.to_string(),
        m.points_count.to_string(),
        m.height_confidence.to_string(),
        m.volume_m3.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, Geometry};

    fn building(id: &str) -> Building {
        Building {
            id: id.to_string(),
            geometry: Geometry::Point(point!(x: 0.0, y: 0.0)),
            area_m2: 10.0,
        }
    }

    fn metrics(mean: f64) -> TimestampMetrics {
        TimestampMetrics {
            height_mean: mean,
            height_max: mean,
            points_count: 1,
            height_confidence: 1.0,
            volume_m3: mean * 10.0,
        }
    }

    fn label(s: &str) -> TimestampLabel {
        // 2023-01 et 2023-02
        match s {
            "202301" => TimestampLabel::from_millis(1_672_531_200_000).unwrap(),
            _ => TimestampLabel::from_millis(1_675_209_600_000).unwrap(),
        }
    }

    #[test]
    fn test_left_merge_keeps_all_buildings() {
        let mut table = EnrichedTable::new(vec![building("42"), building("43")]);
        let jan = label("202301");
        let feb = label("202302");

        let matched = table.merge_timestamp(jan.clone(), BTreeMap::from([("42".into(), metrics(5.0))]));
        assert_eq!(matched, 1);
        table.merge_timestamp(feb.clone(), BTreeMap::from([("42".into(), metrics(6.0))]));

        assert_eq!(table.len(), 2);
        assert_eq!(table.metrics(0, &jan).unwrap().height_mean, 5.0);
        assert_eq!(table.metrics(0, &feb).unwrap().height_mean, 6.0);
        assert!(table.metrics(1, &jan).is_none());
        assert_eq!(table.timestamps(), &[jan, feb]);
    }

    #[test]
    fn test_metric_columns_order() {
        let mut table = EnrichedTable::new(vec![building("42")]);
        table.merge_timestamp(label("202301"), BTreeMap::new());
        table.merge_timestamp(label("202302"), BTreeMap::new());

        let columns = table.metric_columns();
        assert_eq!(columns.len(), 10);
        assert_eq!(columns[0], "height_mean_202301");
        assert_eq!(columns[4], "volume_m3_202301");
        assert_eq!(columns[5], "height_mean_202302");
    }

    #[test]
    fn test_duplicate_ids_and_timestamps() {
        let mut table = EnrichedTable::new(vec![building("1"), building("1"), building("2")]);
        assert_eq!(table.len(), 2);

        table.merge_timestamp(label("202301"), BTreeMap::new());
        let again = table.merge_timestamp(
            label("202301"),
            BTreeMap::from([("1".into(), metrics(1.0))]),
        );
        assert_eq!(again, 0);
        assert_eq!(table.timestamps().len(), 1);
    }
}
