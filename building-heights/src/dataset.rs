//! Table tabulaire générique (colonnes texte) lue et écrite en CSV

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Table en mémoire: en-tête + lignes de même largeur
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Ajoute une ligne de la largeur de l'en-tête
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "Row has {} values, expected {}",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    /// Lit un CSV avec en-tête. Lignes de largeur incohérente ou UTF-8 invalide → erreur.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let columns: Vec<String> = reader
            .headers()
            .context("Invalid CSV header")?
            .iter()
            .map(String::from)
            .collect();
        if columns.is_empty() {
            bail!("CSV has no columns");
        }

        let mut table = Self::new(columns);
        for (i, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Invalid CSV record {}", i + 1))?;
            table.rows.push(record.iter().map(String::from).collect());
        }
        Ok(table)
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Failed to read {}", path.display()))
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Union externe: colonnes dans l'ordre de première apparition, cellules
    /// manquantes vides.
    pub fn union(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut result = Table::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for table in tables {
            let mapping: Vec<usize> = table
                .columns
                .iter()
                .map(|c| {
                    *index.entry(c.clone()).or_insert_with(|| {
                        result.columns.push(c.clone());
                        result.columns.len() - 1
                    })
                })
                .collect();

            // Élargit les lignes déjà présentes
            let width = result.columns.len();
            for row in &mut result.rows {
                row.resize(width, String::new());
            }

            for row in table.rows {
                let mut out = vec![String::new(); width];
                for (value, &target) in row.into_iter().zip(&mapping) {
                    out[target] = value;
                }
                result.rows.push(out);
            }
        }
        result
    }
}
