//! Meteoblue `basic-1h` forecast client

use reqwest::Client;
use serde_json::Value;
use tracing::instrument;

use super::{coordinate, http::get_json};
use crate::cache::{CacheType, QueryParams};
use crate::error::Result;
use crate::retry::RetryingFetcher;
use crate::weather::Location;

#[derive(Debug, Clone)]
pub struct ForecastClient {
    http: Client,
    fetcher: RetryingFetcher,
    endpoint: String,
    api_key: String,
    ttl_seconds: u64,
}

impl ForecastClient {
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://my.meteoblue.com`
    /// * `ttl_seconds` - Cache lifetime of a forecast payload
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
            endpoint: format!("{}/packages/basic-1h", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            ttl_seconds,
        }
    }

    /// Fetches the hourly forecast payload (7 days starting today, UTC).
    #[instrument(skip(self), fields(lat = location.lat, lon = location.lon))]
    pub async fn hourly(&self, location: Location) -> Result<Value> {
        let params = QueryParams::new()
            .with("lat", coordinate(location.lat))
            .with("lon", coordinate(location.lon))
            .with("asl", 0)
            .with("format", "json")
            .with("tz", "UTC");
        let request = params.clone().with("apikey", &self.api_key);
        let (http, url) = (&self.http, self.endpoint.as_str());

        self.fetcher
            .fetch(url, &params, CacheType::Weather, self.ttl_seconds, move || {
                get_json(http, url, request.clone())
            })
            .await
    }
}
