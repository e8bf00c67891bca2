//! Types d'erreurs pour le crate height-raster

use thiserror::Error;

/// Erreurs pouvant survenir lors du décodage ou de l'échantillonnage d'un raster
#[derive(Debug, Error)]
pub enum RasterError {
    /// Erreur d'I/O lors de la lecture d'un fichier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fichier NPY corrompu ou format invalide
    #[error("Invalid NPY payload: {0}")]
    InvalidNpy(String),

    /// Type de données non supporté
    #[error("Unsupported dtype: {0}")]
    UnsupportedDtype(String),

    /// Le tableau n'est pas en deux dimensions
    #[error("Expected a 2-D array, got shape {0:?}")]
    NotTwoDimensional(Vec<usize>),

    /// Les grilles presence/height n'ont pas la même forme
    #[error("Grid shape mismatch: presence {presence:?} vs height {height:?}")]
    ShapeMismatch {
        presence: (usize, usize),
        height: (usize, usize),
    },

    /// Emprise invalide (min >= max ou valeur non finie)
    #[error("Invalid bounding box: {0}")]
    InvalidBounds(String),
}

impl RasterError {
    /// Crée une erreur NPY avec contexte
    pub fn invalid_npy(reason: impl Into<String>) -> Self {
        Self::InvalidNpy(reason.into())
    }
}
