//! Visual Crossing timeline client
//!
//! Serves both past days (historical) and the live `currentConditions`
//! block.

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use tracing::instrument;

use super::{coordinate, http::get_json};
use crate::cache::{CacheType, QueryParams};
use crate::error::Result;
use crate::retry::RetryingFetcher;
use crate::weather::Location;

#[derive(Debug, Clone)]
pub struct TimelineClient {
    http: Client,
    fetcher: RetryingFetcher,
    base_url: String,
    api_key: String,
    historical_ttl: u64,
    current_ttl: u64,
}

impl TimelineClient {
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://weather.visualcrossing.com`
    /// * `historical_ttl` - Cache lifetime of a past day
    /// * `current_ttl` - Cache lifetime of current conditions
    pub fn new(
        http: Client,
        fetcher: RetryingFetcher,
        base_url: &str,
        api_key: impl Into<String>,
        historical_ttl: u64,
        current_ttl: u64,
    ) -> Self {
        Self {
            http,
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            historical_ttl,
            current_ttl,
        }
    }

    fn endpoint(&self, location: Location, date: NaiveDate) -> String {
        format!(
            "{}/VisualCrossingWebServices/rest/services/timeline/{},{}/{}",
            self.base_url,
            coordinate(location.lat),
            coordinate(location.lon),
            date.format("%Y-%m-%d")
        )
    }

    /// Daily record for one past date.
    #[instrument(skip(self), fields(lat = location.lat, lon = location.lon))]
    pub async fn day(&self, location: Location, date: NaiveDate) -> Result<Value> {
        let params = QueryParams::new()
            .with("unitGroup", "metric")
            .with("include", "days")
            .with("contentType", "json");
        self.request(
            self.endpoint(location, date),
            params,
            CacheType::Historical,
            self.historical_ttl,
        )
        .await
    }

    /// Current conditions; `today` dates the request.
    #[instrument(skip(self), fields(lat = location.lat, lon = location.lon))]
    pub async fn current(&self, location: Location, today: NaiveDate) -> Result<Value> {
        let params = QueryParams::new()
            .with("unitGroup", "metric")
            .with("include", "current,days")
            .with("contentType", "json");
        self.request(
            self.endpoint(location, today),
            params,
            CacheType::Weather,
            self.current_ttl,
        )
        .await
    }

    async fn request(
        &self,
        endpoint: String,
        params: QueryParams,
        cache_type: CacheType,
        ttl_seconds: u64,
    ) -> Result<Value> {
        let request = params.clone().with("key", &self.api_key);
        let (http, url) = (&self.http, endpoint.as_str());

        self.fetcher
            .fetch(url, &params, cache_type, ttl_seconds, move || {
                get_json(http, url, request.clone())
            })
            .await
    }
}
