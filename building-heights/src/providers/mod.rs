//! Fournisseurs de données externes
//!
//! - emprises de bâtiments (GeoJSON)
//! - séries temporelles raster de présence / hauteur (NPY)
//!
//! Les traits isolent l'orchestrateur du transport: les tests utilisent des
//! implémentations en mémoire.

pub mod footprints;
pub mod raster;

pub use footprints::HttpFootprintProvider;
pub use raster::HttpRasterProvider;

use std::time::Duration;

use anyhow::Result;
use height_raster::{BBox, Grid};
use reqwest::blocking::{Client, RequestBuilder};
use thiserror::Error;

use crate::config::BandConfig;
use crate::model::Footprint;

/// Source d'emprises de bâtiments
pub trait FootprintProvider: Send + Sync {
    /// Emprises intersectant la tuile. Aucune donnée → liste vide.
    fn fetch(&self, tile: &BBox, min_zoom: u8) -> Result<Vec<Footprint>>;
}

/// Source de séries temporelles raster
pub trait RasterProvider: Send + Sync {
    /// Dates disponibles sur la tuile (millisecondes epoch)
    fn timestamps(&self, tile: &BBox) -> Result<Vec<i64>>;

    /// Vignette d'une bande pour une date, `width` colonnes x `height` lignes
    fn fetch_band(
        &self,
        tile: &BBox,
        timestamp_ms: i64,
        band: &BandConfig,
        width: u32,
        height: u32,
    ) -> Result<Grid>;
}

/// Erreurs de transport des fournisseurs HTTP
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("Provider URL is not configured")]
    MissingUrl,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Client HTTP bloquant avec timeout et jeton optionnel
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: Client,
    token: Option<String>,
}

impl HttpClient {
    /// Le jeton est lu dans la variable d'environnement `token_env` si elle existe
    pub(crate) fn new(timeout_secs: u64, token_env: Option<&str>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("building-heights/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let token = token_env.and_then(|name| std::env::var(name).ok());
        Ok(Self { client, token })
    }

    pub(crate) fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn require_url(url: &str) -> Result<&str, ProviderError> {
    let url = url.trim_end_matches('/');
    if url.is_empty() {
        return Err(ProviderError::MissingUrl);
    }
    Ok(url)
}
