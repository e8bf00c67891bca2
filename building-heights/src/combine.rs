//! Fusion des tables par tuile en une table unique

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Table;
use crate::export::TILE_FILE_PREFIX;

/// Bilan de la fusion
#[derive(Debug, Clone, Default, Serialize)]
pub struct CombineSummary {
    pub files_found: usize,
    pub files_read: usize,
    /// Fichiers ignorés et raison
    pub skipped: Vec<(PathBuf, String)>,
    pub rows: usize,
    pub columns: usize,
}

/// Fichiers de tuiles sous `dir`, triés par chemin
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}*.csv",
        glob::Pattern::escape(&dir.display().to_string()),
        TILE_FILE_PREFIX
    );

    let mut paths = Vec::new();
    for entry in glob::glob(&pattern).context("Invalid discovery pattern")? {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => warn!(error = %e, "Unreadable path during discovery"),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Lit une table de tuile; elle doit contenir une colonne `geometry`
fn read_tile_table(path: &Path) -> Result<Table> {
    let table = Table::read_csv(path)?;
    if table.column_index("geometry").is_none() {
        bail!("Missing geometry column");
    }
    Ok(table)
}

/// Fusionne les fichiers donnés. Les fichiers illisibles sont ignorés.
pub fn combine_files(paths: &[PathBuf]) -> Result<(Table, CombineSummary)> {
    if paths.is_empty() {
        bail!("No tile files found");
    }

    let mut summary = CombineSummary {
        files_found: paths.len(),
        ..Default::default()
    };
    let mut tables = Vec::with_capacity(paths.len());

    for path in paths {
        match read_tile_table(path) {
            Ok(table) => {
                info!(path = %path.display(), rows = table.len(), "Loaded tile file");
                tables.push(table);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "Skipping unreadable file");
                summary.skipped.push((path.clone(), format!("{:#}", e)));
            }
        }
    }

    if tables.is_empty() {
        bail!("None of the {} tile files could be read", paths.len());
    }

    summary.files_read = tables.len();
    let combined = Table::union(tables);
    summary.rows = combined.len();
    summary.columns = combined.columns().len();
    Ok((combined, summary))
}

/// Découvre, fusionne et écrit la table combinée
pub fn combine_dir(dir: &Path, output: &Path) -> Result<CombineSummary> {
    let paths = discover(dir)?;
    info!(dir = %dir.display(), files = paths.len(), "Found tile files");

    let (table, summary) =
        combine_files(&paths).with_context(|| format!("Failed to combine {}", dir.display()))?;
    table.write_csv(output)?;

    info!(
        output = %output.display(),
        rows = summary.rows,
        columns = summary.columns,
        skipped = summary.skipped.len(),
        "Combined dataset written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_combine_skips_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "buildings_tile_a.csv",
            b"id,area_m2,height_mean_202301,geometry\n1,10,5,POINT(0 0)\n",
        );
        write(dir.path(), "buildings_tile_b.csv", b"id,area_m2,geometry\n2,\xff\xfe\n");
        write(
            dir.path(),
            "buildings_tile_c.csv",
            b"id,area_m2,height_mean_202302,geometry\n3,12,7,POINT(1 1)\n",
        );
        write(dir.path(), "other.csv", b"id\n99\n");

        let output = dir.path().join("combined/all.csv");
        let summary = combine_dir(dir.path(), &output).unwrap();
        assert_eq!(summary.files_found, 3);
        assert_eq!(summary.files_read, 2);
        assert_eq!(summary.skipped.len(), 1);
        assert!(summary.skipped[0].0.ends_with("buildings_tile_b.csv"));
        assert_eq!(summary.rows, 2);

        let combined = Table::read_csv(&output).unwrap();
        assert_eq!(
            combined.columns(),
            &["id", "area_m2", "height_mean_202301", "geometry", "height_mean_202302"]
        );
        assert_eq!(combined.rows()[1], vec!["3", "12", "", "POINT(1 1)", "7"]);
    }

    #[test]
    fn test_missing_geometry_column_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "buildings_tile_a.csv", b"id,area_m2\n1,10\n");
        assert!(combine_files(&[a]).is_err());
    }

    #[test]
    fn test_nothing_to_combine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path()).unwrap().is_empty());
        assert!(combine_dir(dir.path(), &dir.path().join("out.csv")).is_err());
    }
}
