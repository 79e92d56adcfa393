//! Error types for the weather core
//!
//! Provides unified error handling using thiserror. Provider failures are
//! classified separately so the retry layer can decide what to do with them.

use chrono::NaiveDate;
use thiserror::Error;

// == Retry Classification ==
/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    /// Returns true if repeating the same call may succeed.
    fn is_retryable(&self) -> bool;
}

// == Provider Error Enum ==
/// Failure reported by a remote weather or geocoding call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Upstream asked us to slow down (HTTP 429)
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Connection reset, DNS failure or 5xx response
    #[error("transient network failure: {0}")]
    Transient(String),

    /// The call did not complete within the request timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// API key missing, invalid or lacking permission (HTTP 401/403)
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// Upstream rejected the request itself (other 4xx)
    #[error("malformed request: {0}")]
    BadRequest(String),

    /// Body could not be decoded as JSON
    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_) | ProviderError::Transient(_) | ProviderError::Timeout(_)
        )
    }
}

// == Weather Error Enum ==
/// Unified error type for the weather core.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// Cache storage failure; never escapes the cache store
    #[error("cache I/O error: {0}")]
    CacheIo(String),

    /// Provider failure that another attempt could fix
    #[error("temporary provider failure: {0}")]
    RetryableProvider(ProviderError),

    /// Provider failure that retrying will not fix
    #[error("provider rejected the request: {0}")]
    NonRetryableProvider(ProviderError),

    /// Retry budget consumed; carries the last underlying failure
    #[error("giving up after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: ProviderError },

    /// Provider payload lacks the structure we need
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Geocoding returned no match
    #[error("location not found: {0}")]
    LocationNotFound(String),

    /// Forecast requested beyond the provider horizon
    #[error("date {requested} is beyond the forecast horizon (latest {latest})")]
    DateOutOfRange { requested: NaiveDate, latest: NaiveDate },

    /// Date phrase could not be understood
    #[error("unable to parse date: {0}")]
    InvalidDate(String),

    /// Configuration missing or inconsistent
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ProviderError> for WeatherError {
    fn from(err: ProviderError) -> Self {
        if err.is_retryable() {
            WeatherError::RetryableProvider(err)
        } else {
            WeatherError::NonRetryableProvider(err)
        }
    }
}

impl WeatherError {
    // == User Message ==
    /// Returns the message shown to the user for this failure.
    ///
    /// Every variant maps to a distinct sentence so the cause is clear
    /// without reading the logs.
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::CacheIo(_) => {
                "The local weather cache could not be used. Results were fetched live.".to_string()
            }
            WeatherError::RetryableProvider(err) => format!(
                "The weather service is temporarily unavailable ({err}). Please try again shortly."
            ),
            WeatherError::NonRetryableProvider(ProviderError::Unauthorized(_)) => {
                "The weather service rejected our credentials. \
                 Please check the configured API keys."
                    .to_string()
            }
            WeatherError::NonRetryableProvider(err) => {
                format!("The weather service could not handle this request ({err}).")
            }
            WeatherError::ExhaustedRetries { attempts, last } => format!(
                "Sorry, I couldn't reach the weather service after {attempts} attempts \
                 (last error: {last})."
            ),
            WeatherError::MalformedPayload(detail) => format!(
                "The weather service returned data I couldn't understand ({detail})."
            ),
            WeatherError::LocationNotFound(name) => format!(
                "I'm sorry, but I don't have information for the location '{name}'. \
                 Could you please check the spelling or try a different city?"
            ),
            WeatherError::DateOutOfRange { requested, latest } => format!(
                "I can only provide weather for the past, today and up to 6 days ahead. \
                 {requested} is too far in the future; the latest date available is {latest}."
            ),
            WeatherError::InvalidDate(phrase) => format!(
                "I couldn't understand the date '{phrase}'. \
                 Try 'tomorrow', 'next friday' or 2024-05-01."
            ),
            WeatherError::Config(detail) => {
                format!("The tool is not configured correctly: {detail}")
            }
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the weather core.
pub type Result<T> = std::result::Result<T, WeatherError>;
