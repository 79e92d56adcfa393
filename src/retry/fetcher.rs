//! Retrying Fetcher
//!
//! Every upstream call goes through [`RetryingFetcher::fetch`]: cache lookup
//! first, then the retry loop, then a cache write on success.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{RetryPolicy, RetryState};
use crate::cache::{CacheStore, CacheType, QueryParams};
use crate::config::Config;
use crate::error::{ProviderError, Result, Retryable, WeatherError};

// == Retrying Fetcher ==
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    cache: Arc<CacheStore>,
    policy: RetryPolicy,
    request_timeout: Duration,
}

impl RetryingFetcher {
    /// # Arguments
    /// * `cache` - Shared response cache
    /// * `policy` - Attempt budget and backoff schedule
    /// * `request_timeout` - Per-attempt deadline; expiry counts as a retryable failure
    pub fn new(cache: Arc<CacheStore>, policy: RetryPolicy, request_timeout: Duration) -> Self {
        Self {
            cache,
            policy,
            request_timeout,
        }
    }

    pub fn from_config(config: &Config, cache: Arc<CacheStore>) -> Self {
        Self::new(cache, config.retry.clone(), config.request_timeout)
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns the cached response for the request, or calls `call_fn`
    /// until it succeeds, fails non-retryably, or the attempt budget runs
    /// out.
    ///
    /// # Arguments
    /// * `endpoint` - Full request URL, used for the cache key
    /// * `params` - Query parameters, used for the cache key
    /// * `cache_type` - Category of the response
    /// * `ttl_seconds` - Lifetime of the cached response
    /// * `call_fn` - Performs one upstream attempt
    ///
    /// # Errors
    /// * `ExhaustedRetries` carrying the last error when every attempt failed retryably
    /// * `RetryableProvider` on a retryable failure when the policy allows no retries
    /// * `NonRetryableProvider` on the first non-retryable failure
    pub async fn fetch<F, Fut>(
        &self,
        endpoint: &str,
        params: &QueryParams,
        cache_type: CacheType,
        ttl_seconds: u64,
        mut call_fn: F,
    ) -> Result<Value>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<Value, ProviderError>>,
    {
        let key = CacheStore::key_for(endpoint, params, cache_type);
        if let Some(cached) = self.cache.get(&key) {
            debug!(%key, "Serving {} response from cache", cache_type);
            return Ok(cached);
        }

        let mut state = RetryState::start();
        loop {
            match state {
                RetryState::Attempting { attempt } => {
                    info!(
                        endpoint,
                        attempt,
                        max_attempts = self.policy.max_attempts(),
                        "Making {} request",
                        cache_type
                    );

                    let outcome = match tokio::time::timeout(self.request_timeout, call_fn()).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Timeout(format!(
                            "no response within {:.1}s",
                            self.request_timeout.as_secs_f64()
                        ))),
                    };

                    match outcome {
                        Ok(value) => {
                            state = state.on_success();
                            if let RetryState::Succeeded { attempts } = state {
                                debug!(endpoint, attempts, "Request succeeded");
                            }
                            self.cache.put(&key, &value, ttl_seconds);
                            return Ok(value);
                        }
                        Err(err) => {
                            state = state.on_failure(err.is_retryable(), &self.policy);
                            match state {
                                RetryState::Exhausted { .. } if self.policy.max_retries == 0 => {
                                    warn!(
                                        endpoint,
                                        error = %err,
                                        "Request failed, retries disabled"
                                    );
                                    return Err(err.into());
                                }
                                RetryState::Exhausted { attempts } => {
                                    warn!(endpoint, attempts, error = %err, "Retries exhausted");
                                    return Err(WeatherError::ExhaustedRetries {
                                        attempts,
                                        last: err,
                                    });
                                }
                                RetryState::Rejected { attempts } => {
                                    warn!(
                                        endpoint,
                                        attempts,
                                        error = %err,
                                        "Request failed, not retrying"
                                    );
                                    return Err(err.into());
                                }
                                _ => {
                                    warn!(
                                        endpoint,
                                        attempt,
                                        error = %err,
                                        "Request failed, will retry"
                                    );
                                }
                            }
                        }
                    }
                }
                RetryState::Backoff { next_attempt, delay } => {
                    let wait = self.policy.apply_jitter(delay);
                    debug!(
                        next_attempt,
                        wait_ms = wait.as_millis() as u64,
                        "Backing off before retry"
                    );
                    tokio::time::sleep(wait).await;
                    state = state.after_backoff();
                }
                RetryState::Succeeded { .. }
                | RetryState::Exhausted { .. }
                | RetryState::Rejected { .. } => {
                    unreachable!("terminal states return from the attempt arm")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    const ENDPOINT: &str = "https://example.test/forecast";

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, 0.001, 0.005).unwrap()
    }

    fn fetcher(dir: &TempDir, max_retries: u32) -> RetryingFetcher {
        RetryingFetcher::new(
            Arc::new(CacheStore::new(dir.path(), true)),
            fast_policy(max_retries),
            Duration::from_secs(5),
        )
    }

    fn params() -> QueryParams {
        QueryParams::new().with("lat", 52.52).with("lon", 13.405)
    }

    #[tokio::test]
    async fn test_exhausts_after_max_retries_plus_one_attempts() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, 3);
        let calls = AtomicU32::new(0);

        let result = fetcher
            .fetch(ENDPOINT, &params(), CacheType::Weather, 3600, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Transient("HTTP 503".to_string())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(WeatherError::ExhaustedRetries { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert_eq!(last, ProviderError::Transient("HTTP 503".to_string()));
            }
            other => panic!("expected ExhaustedRetries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_fails_after_one_attempt() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, 3);
        let calls = AtomicU32::new(0);

        let result = fetcher
            .fetch(ENDPOINT, &params(), CacheType::Weather, 3600, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Unauthorized("HTTP 401".to_string())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(WeatherError::NonRetryableProvider(ProviderError::Unauthorized(_)))
        ));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures_and_caches() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, 3);
        let calls = AtomicU32::new(0);

        let result = fetcher
            .fetch(ENDPOINT, &params(), CacheType::Weather, 3600, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ProviderError::RateLimited("HTTP 429".to_string()))
                    } else {
                        Ok(json!({"temperature": 18.0}))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, json!({"temperature": 18.0}));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Second request is answered from cache without calling upstream
        let again = fetcher
            .fetch(ENDPOINT, &params(), CacheType::Weather, 3600, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Transient("should not be called".to_string())) }
            })
            .await
            .unwrap();

        assert_eq!(again, result);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_upstream() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, 3);
        let key = CacheStore::key_for(ENDPOINT, &params(), CacheType::Historical);
        fetcher.cache().put(&key, &json!({"cached": true}), 3600);
        let calls = AtomicU32::new(0);

        let result = fetcher
            .fetch(ENDPOINT, &params(), CacheType::Historical, 3600, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!({"cached": false})) }
            })
            .await
            .unwrap();

        assert_eq!(result, json!({"cached": true}));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_request_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, 0);

        let _ = fetcher
            .fetch(ENDPOINT, &params(), CacheType::Weather, 3600, || async {
                Err(ProviderError::Transient("HTTP 500".to_string()))
            })
            .await;

        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test]
    async fn test_zero_retries_reports_retryable_failure() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, 0);
        let calls = AtomicU32::new(0);

        let result = fetcher
            .fetch(ENDPOINT, &params(), CacheType::Weather, 3600, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::RateLimited("HTTP 429".to_string())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(WeatherError::RetryableProvider(ProviderError::RateLimited(_)))
        ));
    }

    #[tokio::test]
    async fn test_disabled_cache_always_calls_upstream() {
        let fetcher = RetryingFetcher::new(
            Arc::new(CacheStore::disabled()),
            fast_policy(0),
            Duration::from_secs(5),
        );
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let value = fetcher
                .fetch(ENDPOINT, &params(), CacheType::Weather, 3600, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(json!({"ok": true})) }
                })
                .await
                .unwrap();
            assert_eq!(value, json!({"ok": true}));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_retryable() {
        let dir = TempDir::new().unwrap();
        let fetcher = RetryingFetcher::new(
            Arc::new(CacheStore::new(dir.path(), true)),
            fast_policy(1),
            Duration::from_millis(20),
        );
        let calls = AtomicU32::new(0);

        let result = fetcher
            .fetch(ENDPOINT, &params(), CacheType::Weather, 3600, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(json!({}))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            result,
            Err(WeatherError::ExhaustedRetries {
                attempts: 2,
                last: ProviderError::Timeout(_)
            })
        ));
    }
}
