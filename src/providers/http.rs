//! Shared HTTP plumbing
//!
//! One GET-with-query helper and the mapping from HTTP/transport failures
//! to [`ProviderError`].

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::cache::QueryParams;
use crate::error::{ProviderError, Result, WeatherError};

const USER_AGENT: &str = concat!("flight-weather/", env!("CARGO_PKG_VERSION"));

/// Longest upstream error body echoed into an error message
const MAX_BODY_IN_ERROR: usize = 200;

/// Builds the shared reqwest client.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| WeatherError::Config(format!("failed to build HTTP client: {e}")))
}

/// Performs one GET and decodes the body as JSON.
pub async fn get_json(
    client: &Client,
    url: &str,
    params: QueryParams,
) -> std::result::Result<Value, ProviderError> {
    debug!(url, "GET");

    let response = client
        .get(url)
        .query(params.pairs())
        .send()
        .await
        .map_err(classify_transport)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status, &body));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Maps a non-success status to a provider error.
///
/// 429, 408 and 5xx are retryable; every other 4xx is not.
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let detail = if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        let body: String = body.chars().take(MAX_BODY_IN_ERROR).collect();
        format!("HTTP {status}: {}", body.trim())
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(detail),
        StatusCode::REQUEST_TIMEOUT => ProviderError::Timeout(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized(detail),
        s if s.is_server_error() => ProviderError::Transient(detail),
        _ => ProviderError::BadRequest(detail),
    }
}

fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else if err.is_builder() {
        ProviderError::BadRequest(err.to_string())
    } else {
        ProviderError::Transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Retryable;

    #[test]
    fn test_retryable_statuses() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            assert!(classify_status(status, "").is_retryable(), "{status}");
        }
    }

    #[test]
    fn test_non_retryable_statuses() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            ProviderError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, ""),
            ProviderError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, ""),
            ProviderError::BadRequest(_)
        ));
        assert!(!classify_status(StatusCode::NOT_FOUND, "").is_retryable());
    }

    #[test]
    fn test_error_detail_truncates_body() {
        let body = "x".repeat(1000);
        let ProviderError::Transient(detail) = classify_status(StatusCode::BAD_GATEWAY, &body)
        else {
            panic!("expected transient");
        };
        assert!(detail.starts_with("HTTP 502 Bad Gateway: "));
        assert!(detail.len() < 300);
    }
}
