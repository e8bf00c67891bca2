//! # height-raster
//!
//! Décodage et échantillonnage des rasters de présence/hauteur de bâtiments.
//!
//! ## Features
//!
//! - Décodage NPY (v1, v2, v3, ordre C ou Fortran, tableaux structurés à un champ)
//! - Échantillonnage presence/height → observations ponctuelles géolocalisées
//! - Types `BBox` et `Grid` partagés avec le pipeline d'enrichissement
//!
//! ## Usage
//!
//! ```rust,ignore
//! use height_raster::{npy, sample, BBox, DEFAULT_PRESENCE_THRESHOLD};
//!
//! let tile = BBox::new(72.93, 19.15, 72.95, 19.17)?;
//! let presence = npy::decode(&presence_bytes)?;
//! let height = npy::decode(&height_bytes)?;
//!
//! let observations = sample(&tile, &presence, &height, DEFAULT_PRESENCE_THRESHOLD)?;
//! println!("{} observations", observations.len());
//! ```

pub mod error;
pub mod npy;
pub mod sampler;
pub mod types;

pub use error::RasterError;
pub use sampler::{linspace, sample, DEFAULT_PRESENCE_THRESHOLD};
pub use types::{BBox, Grid, HeightObservation};
