//! Configuration du pipeline
//!
//! Toutes les constantes du traitement (emprise, seuils, chemins, fournisseurs)
//! sont regroupées ici et passées explicitement à chaque composant.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use height_raster::BBox;
use serde::{Deserialize, Serialize};

/// Configuration principale
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub region: RegionConfig,
    pub grid: GridConfig,
    pub sampling: SamplingConfig,
    pub join: JoinConfig,
    pub footprints: FootprintConfig,
    pub raster: RasterConfig,
    pub storage: StorageConfig,
}

/// Région à traiter (degrés WGS84)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Nom de la région (utilisé dans l'identité de la grille)
    pub name: String,
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            name: "thane".to_string(),
            west: 72.93,
            south: 19.15,
            east: 73.05,
            north: 19.33,
        }
    }
}

impl RegionConfig {
    /// Emprise de la région
    pub fn bounds(&self) -> Result<BBox> {
        BBox::new(self.west, self.south, self.east, self.north)
            .with_context(|| format!("Invalid region bounds for '{}'", self.name))
    }
}

/// Découpage en tuiles
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GridConfig {
    /// Taille d'une cellule (degrés)
    pub cell_size: f64,

    /// Identité de la grille (défaut: `<region>-<cell_size>`)
    pub id: Option<String>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 0.02,
            id: None,
        }
    }
}

/// Bande raster demandée au fournisseur
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BandConfig {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

/// Paramètres d'échantillonnage des rasters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Probabilité minimale de présence d'un bâtiment
    pub presence_threshold: f64,
    /// Largeur des vignettes (colonnes)
    pub width: u32,
    /// Hauteur des vignettes (lignes)
    pub height: u32,
    pub presence_band: BandConfig,
    pub height_band: BandConfig,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            presence_threshold: height_raster::DEFAULT_PRESENCE_THRESHOLD,
            width: 512,
            height: 512,
            presence_band: BandConfig {
                name: "building_presence".to_string(),
                min: 0.0,
                max: 1.0,
            },
            height_band: BandConfig {
                name: "building_height".to_string(),
                min: 0.0,
                max: 100.0,
            },
        }
    }
}

/// Jointure spatiale bâtiments ↔ observations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Distance maximale de jointure, en degrés (~10 m à l'équateur)
    pub max_distance: f64,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            max_distance: 0.0001,
        }
    }
}

/// Fournisseur d'emprises de bâtiments
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FootprintConfig {
    pub url: String,
    pub min_zoom: u8,
    /// Variable d'environnement contenant le jeton d'accès
    pub token_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            min_zoom: 10,
            token_env: None,
            timeout_secs: 60,
        }
    }
}

/// Fournisseur de séries temporelles raster
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RasterConfig {
    pub url: String,
    pub collection: String,
    pub token_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            collection: "GOOGLE/Research/open-buildings-temporal/v1".to_string(),
            token_env: None,
            timeout_secs: 120,
        }
    }
}

/// Emplacements de sortie
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Dossier des tables par tuile
    pub output_dir: PathBuf,
    /// Table combinée
    pub combined_path: PathBuf,
    /// Table finale découpée
    pub final_path: PathBuf,
    /// Polygone de référence (GeoJSON)
    pub boundary_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output/tiles"),
            combined_path: PathBuf::from("output/buildings_all.csv"),
            final_path: PathBuf::from("output/buildings_final.csv"),
            boundary_path: None,
        }
    }
}

impl PipelineConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "thane" => Self::load_embedded(include_str!("presets/thane.json")),
            _ => bail!("Unknown preset: {}. Use: thane", preset),
        }
    }

    /// Preset embarqué ou chemin vers un fichier JSON
    pub fn resolve(name: &str) -> Result<Self> {
        match name {
            "thane" => Self::from_preset(name),
            _ => Self::load(Path::new(name)),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse embedded config")?;
        config.validate()?;
        Ok(config)
    }

    /// Identité de la grille, intégrée au nom des fichiers de sortie
    pub fn grid_id(&self) -> String {
        self.grid
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.region.name, self.grid.cell_size))
    }

    /// Vérifie la cohérence des paramètres
    pub fn validate(&self) -> Result<()> {
        self.region.bounds()?;

        if !(self.grid.cell_size.is_finite() && self.grid.cell_size > 0.0) {
            bail!("grid.cell_size must be > 0, got {}", self.grid.cell_size);
        }
        if !(0.0..=1.0).contains(&self.sampling.presence_threshold) {
            bail!(
                "sampling.presence_threshold must be within [0, 1], got {}",
                self.sampling.presence_threshold
            );
        }
        if self.sampling.width == 0 || self.sampling.height == 0 {
            bail!("sampling dimensions must be non-zero");
        }
        if !(self.join.max_distance.is_finite() && self.join.max_distance > 0.0) {
            bail!("join.max_distance must be > 0, got {}", self.join.max_distance);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_source_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.sampling.presence_threshold, 0.6);
        assert_eq!(config.join.max_distance, 0.0001);
        assert_eq!(config.grid.cell_size, 0.02);
        assert_eq!(config.footprints.min_zoom, 10);
        assert_eq!((config.sampling.width, config.sampling.height), (512, 512));
        assert_eq!(config.sampling.height_band.max, 100.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_preset_thane() {
        let config = PipelineConfig::from_preset("thane").unwrap();
        assert_eq!(config.region.name, "thane");
        assert_eq!(config.region.north, 19.33);
        assert_eq!(config.grid_id(), "thane-0.02");
        assert!(PipelineConfig::from_preset("unknown").is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"grid": {"cell_size": 0.05, "id": "v2"}}"#).unwrap();
        assert_eq!(config.grid.cell_size, 0.05);
        assert_eq!(config.grid_id(), "v2");
        assert_eq!(config.join.max_distance, 0.0001);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.grid.cell_size = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.sampling.presence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.region.east = config.region.west;
        assert!(config.validate().is_err());
    }
}
