//! Stockage des tables par tuile
//!
//! Le nom de fichier est déterministe: bornes à 6 décimales, identité de la
//! grille et empreinte blake3 des bornes exactes (bits `f64`), pour que deux
//! tuiles dont les bornes ne diffèrent qu'au-delà de la 6e décimale ne
//! s'écrasent pas.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use height_raster::BBox;

/// Préfixe commun des fichiers de tuiles
pub const TILE_FILE_PREFIX: &str = "buildings_tile_";

/// Destination des tables de tuiles
pub trait TileSink: Send + Sync {
    /// Écrit `bytes` sous `key`, retourne l'emplacement final
    fn put(&self, key: &str, bytes: &[u8]) -> Result<String>;

    /// Emplacement correspondant à `key` (pour les logs)
    fn location(&self, key: &str) -> String;
}

/// Stockage sur système de fichiers local
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TileSink for FsSink {
    /// Écriture dans un fichier temporaire puis renommage: une tâche
    /// interrompue ne laisse jamais de fichier partiel.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create output dir {}", self.root.display()))?;

        let target = self.root.join(key);
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", key, std::process::id()));

        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("Failed to rename into {}", target.display()));
        }
        Ok(target.display().to_string())
    }

    fn location(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}

/// Garde les caractères sûrs pour un nom de fichier
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Nom du fichier de sortie d'une tuile
pub fn tile_key(tile: &BBox, grid_id: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    for v in [tile.minx, tile.miny, tile.maxx, tile.maxy] {
        hasher.update(&v.to_bits().to_le_bytes());
    }
    hasher.update(grid_id.as_bytes());
    let digest = hasher.finalize();

    format!(
        "{}{:.6}_{:.6}_{:.6}_{:.6}_{}_{}.csv",
        TILE_FILE_PREFIX,
        tile.minx,
        tile.miny,
        tile.maxx,
        tile.maxy,
        sanitize(grid_id),
        hex::encode(&digest.as_bytes()[..4])
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_key_is_deterministic() {
        let tile = BBox::new(72.93, 19.15, 72.95, 19.17).unwrap();
        let key = tile_key(&tile, "thane-0.02");
        assert_eq!(key, tile_key(&tile, "thane-0.02"));
        assert!(key.starts_with("buildings_tile_72.930000_19.150000_72.950000_19.170000_thane-0.02_"));
        assert!(key.ends_with(".csv"));
    }

    #[test]
    fn test_tile_key_distinguishes_close_bounds_and_grids() {
        let a = BBox::new(72.93, 19.15, 72.95, 19.17).unwrap();
        let b = BBox::new(72.930_000_01, 19.15, 72.95, 19.17).unwrap();
        assert_ne!(tile_key(&a, "g"), tile_key(&b, "g"));
        assert_ne!(tile_key(&a, "g1"), tile_key(&a, "g2"));
    }

    #[test]
    fn test_sanitize_grid_id() {
        let tile = BBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let key = tile_key(&tile, "run 1/a");
        assert!(key.contains("_run-1-a_"), "{}", key);
    }

    #[test]
    fn test_fs_sink_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path().join("tiles"));

        let location = sink.put("a.csv", b"id\n1\n").unwrap();
        assert_eq!(location, sink.location("a.csv"));
        assert_eq!(fs::read_to_string(dir.path().join("tiles/a.csv")).unwrap(), "id\n1\n");

        // Aucun fichier temporaire résiduel
        let names: Vec<_> = fs::read_dir(sink.root())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_fs_sink_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        // Le dossier racine est un fichier
        let sink = FsSink::new(&blocker);
        assert!(sink.put("a.csv", b"x").is_err());
    }
}
