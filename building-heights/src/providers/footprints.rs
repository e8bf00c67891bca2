//! Fournisseur HTTP d'emprises de bâtiments
//!
//! `GET <url>?bbox=minx,miny,maxx,maxy&min_zoom=<z>` → FeatureCollection GeoJSON.
//! 204 / 404 signifient « aucun bâtiment ».

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use geojson::{feature::Id, Feature, GeoJson};
use height_raster::BBox;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::{require_url, FootprintProvider, HttpClient, ProviderError};
use crate::config::FootprintConfig;
use crate::model::Footprint;

/// Client du service d'emprises
#[derive(Debug, Clone)]
pub struct HttpFootprintProvider {
    http: HttpClient,
    url: String,
}

impl HttpFootprintProvider {
    pub fn new(config: &FootprintConfig) -> Result<Self> {
        let url = require_url(&config.url)?.to_string();
        let http = HttpClient::new(config.timeout_secs, config.token_env.as_deref())?;
        Ok(Self { http, url })
    }
}

impl FootprintProvider for HttpFootprintProvider {
    fn fetch(&self, tile: &BBox, min_zoom: u8) -> Result<Vec<Footprint>> {
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("bbox", tile.to_string()),
                ("min_zoom", min_zoom.to_string()),
            ])
            .send()
            .map_err(ProviderError::from)?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND {
            debug!(tile = %tile, status = status.as_u16(), "No footprints for tile");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            }
            .into());
        }

        let body = response.text().map_err(ProviderError::from)?;
        parse_footprints(&body).with_context(|| format!("Invalid footprint response for tile {}", tile))
    }
}

/// Identifiant d'une feature: `id` GeoJSON, sinon propriété `id`
fn feature_id(feature: &Feature) -> Option<String> {
    match &feature.id {
        Some(Id::String(s)) => return Some(s.clone()),
        Some(Id::Number(n)) => return Some(n.to_string()),
        None => {}
    }
    match feature.property("id")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Décode une réponse GeoJSON en emprises polygonales.
///
/// Les features sans identifiant, sans géométrie ou non surfaciques sont
/// ignorées.
pub fn parse_footprints(body: &str) -> Result<Vec<Footprint>> {
    let features = match GeoJson::from_str(body)? {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => bail!("Expected a FeatureCollection, got a bare geometry"),
    };

    let total = features.len();
    let mut footprints = Vec::with_capacity(total);
    for feature in features {
        let Some(id) = feature_id(&feature) else {
            continue;
        };
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let geometry = match geo::Geometry::<f64>::try_from(geometry) {
            Ok(g @ (geo::Geometry::Polygon(_) | geo::Geometry::MultiPolygon(_))) => g,
            Ok(_) => continue,
            Err(e) => {
                warn!(id = %id, error = %e, "Invalid footprint geometry");
                continue;
            }
        };
        footprints.push(Footprint { id, geometry });
    }

    if footprints.len() < total {
        warn!(
            skipped = total - footprints.len(),
            total,
            "Footprints skipped (missing id or non-polygonal geometry)"
        );
    }
    Ok(footprints)
}
