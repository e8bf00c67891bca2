//! Fournisseur HTTP de séries temporelles raster
//!
//! - `GET <url>/timestamps?collection&region` → tableau JSON de millisecondes
//! - `GET <url>/thumbnail?collection&region&time&band&dimensions&format=NPY&min&max`
//!   → tableau `.npy` 2-D
//!
//! `region` est le polygone GeoJSON de la tuile.

use anyhow::{Context, Result};
use height_raster::{npy, BBox, Grid};
use tracing::debug;

use super::{require_url, HttpClient, ProviderError, RasterProvider};
use crate::config::{BandConfig, RasterConfig};

/// Client du service de séries temporelles
#[derive(Debug, Clone)]
pub struct HttpRasterProvider {
    http: HttpClient,
    url: String,
    collection: String,
}

impl HttpRasterProvider {
    pub fn new(config: &RasterConfig) -> Result<Self> {
        let url = require_url(&config.url)?.to_string();
        let http = HttpClient::new(config.timeout_secs, config.token_env.as_deref())?;
        Ok(Self {
            http,
            url,
            collection: config.collection.clone(),
        })
    }

    fn get_bytes(&self, endpoint: &str, query: &[(&str, String)]) -> Result<bytes::Bytes> {
        let url = format!("{}/{}", self.url, endpoint);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .map_err(ProviderError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url,
            }
            .into());
        }
        Ok(response.bytes().map_err(ProviderError::from)?)
    }
}

/// Polygone GeoJSON de la tuile (sens horaire depuis le coin sud-ouest)
pub fn region_geojson(tile: &BBox) -> String {
    let ring = tile.ring().iter().map(|c| c.to_vec()).collect();
    geojson::Geometry::new(geojson::Value::Polygon(vec![ring])).to_string()
}

/// Décode la liste des dates: entiers ou flottants en millisecondes
pub fn parse_timestamps(body: &[u8]) -> Result<Vec<i64>> {
    let values: Vec<serde_json::Value> =
        serde_json::from_slice(body).context("Expected a JSON array of timestamps")?;

    values
        .iter()
        .map(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                .with_context(|| format!("Invalid timestamp value: {}", v))
        })
        .collect()
}

impl RasterProvider for HttpRasterProvider {
    fn timestamps(&self, tile: &BBox) -> Result<Vec<i64>> {
        let body = self.get_bytes(
            "timestamps",
            &[
                ("collection", self.collection.clone()),
                ("region", region_geojson(tile)),
            ],
        )?;
        let timestamps = parse_timestamps(&body)?;
        debug!(tile = %tile, count = timestamps.len(), "Fetched raster timestamps");
        Ok(timestamps)
    }

    fn fetch_band(
        &self,
        tile: &BBox,
        timestamp_ms: i64,
        band: &BandConfig,
        width: u32,
        height: u32,
    ) -> Result<Grid> {
        let body = self.get_bytes(
            "thumbnail",
            &[
                ("collection", self.collection.clone()),
                ("region", region_geojson(tile)),
                ("time", timestamp_ms.to_string()),
                ("band", band.name.clone()),
                ("dimensions", format!("{}x{}", width, height)),
                ("format", "NPY".to_string()),
                ("min", band.min.to_string()),
                ("max", band.max.to_string()),
            ],
        )?;

        let grid = npy::decode(&body)
            .with_context(|| format!("Invalid NPY thumbnail for band {}", band.name))?;
        debug!(
            band = %band.name,
            rows = grid.rows(),
            cols = grid.cols(),
            bytes = body.len(),
            "Fetched raster band"
        );
        Ok(grid)
    }
}
