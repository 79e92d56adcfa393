//! Cache Key Module
//!
//! Derives content-addressed keys from a request's endpoint, parameters and
//! cache type.

use std::fmt;

use serde::{Deserialize, Serialize};

// == Cache Type ==
/// Kind of upstream request; selects the TTL and prefixes the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// Geocoding lookups
    Coordinates,
    /// Forecast and current conditions
    Weather,
    /// Past-date observations
    Historical,
}

impl CacheType {
    /// Tag used as key prefix and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::Coordinates => "coordinates",
            CacheType::Weather => "weather",
            CacheType::Historical => "historical",
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Query Params ==
/// Request parameters as name/value pairs, stringified on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, rendering the value with `Display`.
    pub fn with(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.pairs.push((name.into(), value.to_string()));
        self
    }

    /// Pairs in insertion order, suitable for `reqwest::RequestBuilder::query`.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Pairs sorted by name, then value.
    pub fn normalized(&self) -> Vec<(&str, &str)> {
        let mut sorted: Vec<(&str, &str)> = self
            .pairs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        sorted.sort_unstable();
        sorted
    }
}

impl<K: Into<String>, V: fmt::Display> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(QueryParams::new(), |params, (name, value)| params.with(name, value))
    }
}

// == Cache Key ==
/// Deterministic key of the form `<cache type>_<blake3 hex digest>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a request.
    ///
    /// Every component is length-prefixed before hashing so no two distinct
    /// normalized requests share an input byte stream.
    pub fn derive(endpoint: &str, params: &QueryParams, cache_type: CacheType) -> Self {
        let mut hasher = blake3::Hasher::new();
        update_framed(&mut hasher, endpoint);
        for (name, value) in params.normalized() {
            update_framed(&mut hasher, name);
            update_framed(&mut hasher, value);
        }
        let digest = hasher.finalize();
        Self(format!("{}_{}", cache_type.as_str(), digest.to_hex()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn update_framed(hasher: &mut blake3::Hasher, component: &str) {
    hasher.update(&(component.len() as u64).to_le_bytes());
    hasher.update(component.as_bytes());
}
