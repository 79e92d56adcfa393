//! Configuration Module
//!
//! Builds the immutable process configuration from environment variables.
//! One `Config` is constructed in `main` and passed down by reference.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheType;
use crate::error::{Result, WeatherError};
use crate::retry::RetryPolicy;

/// 30 days
pub const DEFAULT_TTL_COORDINATES: u64 = 60 * 60 * 24 * 30;
/// 1 hour
pub const DEFAULT_TTL_WEATHER: u64 = 60 * 60;
/// 1 year
pub const DEFAULT_TTL_HISTORICAL: u64 = 60 * 60 * 24 * 365;

// == Providers ==
/// Upstream services that need an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenCage,
    Meteoblue,
    VisualCrossing,
}

impl Provider {
    pub const ALL: [Provider; 3] = [
        Provider::OpenCage,
        Provider::Meteoblue,
        Provider::VisualCrossing,
    ];

    /// Environment variable holding the provider's key.
    pub fn key_var(self) -> &'static str {
        match self {
            Provider::OpenCage => "OPENCAGE_API_KEY",
            Provider::Meteoblue => "METEOBLUE_API_KEY",
            Provider::VisualCrossing => "VISUALCROSSING_API_KEY",
        }
    }
}

// == Api Keys ==
/// Credentials for the upstream providers.
#[derive(Clone, Default)]
pub struct ApiKeys {
    pub opencage: String,
    pub meteoblue: String,
    pub visualcrossing: String,
}

impl ApiKeys {
    pub fn for_provider(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenCage => &self.opencage,
            Provider::Meteoblue => &self.meteoblue,
            Provider::VisualCrossing => &self.visualcrossing,
        }
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("opencage", &mask(&self.opencage))
            .field("meteoblue", &mask(&self.meteoblue))
            .field("visualcrossing", &mask(&self.visualcrossing))
            .finish()
    }
}

/// Shows only the first and last two characters of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "***".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}***{tail}")
}

// == Endpoints ==
/// Provider base URLs; overridable so tests can point at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub opencage: String,
    pub meteoblue: String,
    pub visualcrossing: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            opencage: "https://api.opencagedata.com".to_string(),
            meteoblue: "https://my.meteoblue.com".to_string(),
            visualcrossing: "https://weather.visualcrossing.com".to_string(),
        }
    }
}

// == Cache Settings ==
/// Per-type cache lifetimes in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTtls {
    pub coordinates: u64,
    pub weather: u64,
    pub historical: u64,
}

impl CacheTtls {
    pub fn for_type(&self, cache_type: CacheType) -> u64 {
        match cache_type {
            CacheType::Coordinates => self.coordinates,
            CacheType::Weather => self.weather,
            CacheType::Historical => self.historical,
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            coordinates: DEFAULT_TTL_COORDINATES,
            weather: DEFAULT_TTL_WEATHER,
            historical: DEFAULT_TTL_HISTORICAL,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub directory: PathBuf,
    pub ttl: CacheTtls,
    /// Seconds between background sweeps of expired entries
    pub cleanup_interval: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("cache"),
            ttl: CacheTtls::default(),
            cleanup_interval: 600,
        }
    }
}

// == Config ==
/// Process configuration, read-only after construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_keys: ApiKeys,
    pub endpoints: Endpoints,
    pub cache: CacheSettings,
    pub retry: RetryPolicy,
    /// Upper bound on a single upstream attempt
    pub request_timeout: Duration,
    /// Location used when a query names none
    pub default_location: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `OPENCAGE_API_KEY`, `METEOBLUE_API_KEY`, `VISUALCROSSING_API_KEY`
    /// - `CACHE_ENABLED` - yes/true/t/1/on enables caching (default: true)
    /// - `CACHE_DIRECTORY` - cache directory (default: cache)
    /// - `CACHE_TTL_COORDINATES` / `CACHE_TTL_WEATHER` / `CACHE_TTL_HISTORICAL` - seconds
    /// - `CACHE_CLEANUP_INTERVAL` - seconds between sweeps (default: 600)
    /// - `MAX_RETRIES` (default: 3), `BASE_RETRY_DELAY` (default: 1.0),
    ///   `MAX_RETRY_DELAY` (default: 10.0), `RETRY_JITTER` (default: 0.5) - seconds
    /// - `REQUEST_TIMEOUT` - seconds per attempt (default: 10)
    /// - `DEFAULT_LOCATION` (default: Berlin)
    /// - `OPENCAGE_BASE_URL`, `METEOBLUE_BASE_URL`, `VISUALCROSSING_BASE_URL`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let string =
            |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let retry = RetryPolicy::new(
            parse_var(&lookup, "MAX_RETRIES", defaults.retry.max_retries)?,
            parse_var(&lookup, "BASE_RETRY_DELAY", defaults.retry.base_delay.as_secs_f64())?,
            parse_var(&lookup, "MAX_RETRY_DELAY", defaults.retry.max_delay.as_secs_f64())?,
        )?
        .with_jitter(parse_var(&lookup, "RETRY_JITTER", defaults.retry.jitter.as_secs_f64())?)?;

        Ok(Self {
            api_keys: ApiKeys {
                opencage: string("OPENCAGE_API_KEY", ""),
                meteoblue: string("METEOBLUE_API_KEY", ""),
                visualcrossing: string("VISUALCROSSING_API_KEY", ""),
            },
            endpoints: Endpoints {
                opencage: string("OPENCAGE_BASE_URL", &defaults.endpoints.opencage),
                meteoblue: string("METEOBLUE_BASE_URL", &defaults.endpoints.meteoblue),
                visualcrossing: string(
                    "VISUALCROSSING_BASE_URL",
                    &defaults.endpoints.visualcrossing,
                ),
            },
            cache: CacheSettings {
                enabled: lookup("CACHE_ENABLED")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(defaults.cache.enabled),
                directory: lookup("CACHE_DIRECTORY")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.cache.directory),
                ttl: CacheTtls {
                    coordinates: parse_var(
                        &lookup,
                        "CACHE_TTL_COORDINATES",
                        DEFAULT_TTL_COORDINATES,
                    )?,
                    weather: parse_var(&lookup, "CACHE_TTL_WEATHER", DEFAULT_TTL_WEATHER)?,
                    historical: parse_var(&lookup, "CACHE_TTL_HISTORICAL", DEFAULT_TTL_HISTORICAL)?,
                },
                cleanup_interval: parse_var(
                    &lookup,
                    "CACHE_CLEANUP_INTERVAL",
                    defaults.cache.cleanup_interval,
                )?,
            },
            retry,
            request_timeout: parse_seconds(&lookup, "REQUEST_TIMEOUT", defaults.request_timeout)?,
            default_location: string("DEFAULT_LOCATION", &defaults.default_location),
        })
    }

    /// Checks that every provider credential is present.
    pub fn validate(&self) -> Result<()> {
        self.validate_for(&Provider::ALL)
    }

    /// Checks the credentials of the given providers only.
    pub fn validate_for(&self, providers: &[Provider]) -> Result<()> {
        let missing: Vec<&str> = providers
            .iter()
            .filter(|provider| self.api_keys.for_provider(**provider).trim().is_empty())
            .map(|provider| provider.key_var())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(WeatherError::Config(format!(
                "required environment variables not set: {}",
                missing.join(", ")
            )))
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_keys: ApiKeys::default(),
            endpoints: Endpoints::default(),
            cache: CacheSettings::default(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(10),
            default_location: "Berlin".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WeatherError::Config(format!("{name} has invalid value '{raw}'"))),
        None => Ok(default),
    }
}

fn parse_seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> Result<Duration> {
    let secs = parse_var(lookup, name, default.as_secs_f64())?;
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| WeatherError::Config(format!("{name} must be a positive number of seconds")))
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "yes" | "true" | "t" | "1" | "on")
}
