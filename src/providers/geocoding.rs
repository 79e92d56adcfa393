//! OpenCage geocoding client

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::http::get_json;
use crate::cache::{CacheType, QueryParams};
use crate::error::{Result, WeatherError};
use crate::retry::RetryingFetcher;
use crate::weather::Location;

/// Resolved place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
    /// Formatted place name as returned by the geocoder
    pub name: String,
}

impl Coordinates {
    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lon)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    formatted: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Clone)]
pub struct GeocodingClient {
    http: Client,
    fetcher: RetryingFetcher,
    endpoint: String,
    api_key: String,
    ttl_seconds: u64,
}

impl GeocodingClient {
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://api.opencagedata.com`
    /// * `ttl_seconds` - Cache lifetime of a resolved place
    pub fn new(
        http: Client,
        fetcher: RetryingFetcher,
        base_url: &str,
        api_key: impl Into<String>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            http,
            fetcher,
            endpoint: format!("{}/geocode/v1/json", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            ttl_seconds,
        }
    }

    /// Resolves free text to coordinates.
    ///
    /// # Errors
    /// `LocationNotFound` when the geocoder has no match.
    #[instrument(skip(self))]
    pub async fn geocode(&self, query: &str) -> Result<Coordinates> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WeatherError::LocationNotFound(String::new()));
        }

        // The API key is left out of the cache key
        let params = QueryParams::new().with("q", query).with("limit", 1);
        let request = params.clone().with("key", &self.api_key);
        let (http, url) = (&self.http, self.endpoint.as_str());

        let payload = self
            .fetcher
            .fetch(url, &params, CacheType::Coordinates, self.ttl_seconds, move || {
                get_json(http, url, request.clone())
            })
            .await?;

        let coordinates = parse_geocode(&payload, query)?;
        info!(
            lat = coordinates.lat,
            lon = coordinates.lon,
            "Resolved '{}' to {}",
            query,
            coordinates.name
        );
        Ok(coordinates)
    }
}

fn parse_geocode(payload: &Value, query: &str) -> Result<Coordinates> {
    let response = GeocodeResponse::deserialize(payload)
        .map_err(|e| WeatherError::MalformedPayload(format!("geocoding: {e}")))?;

    let first = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::LocationNotFound(query.to_string()))?;

    Ok(Coordinates {
        lat: first.geometry.lat,
        lon: first.geometry.lng,
        name: first.formatted.unwrap_or_else(|| query.to_string()),
    })
}
