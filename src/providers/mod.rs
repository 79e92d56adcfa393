//! Provider Clients
//!
//! Thin HTTP clients for the geocoding, forecast and timeline APIs. Each
//! request runs through the shared [`RetryingFetcher`](crate::retry::RetryingFetcher)
//! and returns the raw JSON payload; normalization happens in
//! [`crate::weather`].

mod forecast;
mod geocoding;
mod http;
mod timeline;

pub use forecast::ForecastClient;
pub use geocoding::{Coordinates, GeocodingClient};
pub use http::{build_http_client, classify_status, get_json};
pub use timeline::TimelineClient;

/// Formats a coordinate for request parameters.
///
/// Four decimals (about 11 m) keeps cache keys stable across geocoder
/// rounding noise.
pub(crate) fn coordinate(value: f64) -> String {
    format!("{value:.4}")
}
