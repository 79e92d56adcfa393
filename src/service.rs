//! Weather Service
//!
//! Answers one user query end to end: geocode, fetch, normalize, score and
//! (for the flying outlook) rank.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::cache::{CacheStore, CacheType};
use crate::config::Config;
use crate::error::{Result, WeatherError};
use crate::providers::{
    build_http_client, Coordinates, ForecastClient, GeocodingClient, TimelineClient,
};
use crate::retry::RetryingFetcher;
use crate::scoring::{DayRanker, FlightScoringEngine, ScoreBreakdown};
use crate::weather::{normalize_current, normalize_forecast, normalize_historical, WeatherRecord};

/// Days after today covered by the forecast provider
pub const FORECAST_HORIZON_DAYS: i64 = 6;

/// Last date a forecast is available for.
pub fn latest_forecast_date(today: NaiveDate) -> NaiveDate {
    today + Duration::days(FORECAST_HORIZON_DAYS)
}

/// Weather and score for one place and day.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub place: Coordinates,
    pub record: WeatherRecord,
    pub score: ScoreBreakdown,
}

/// Scored forecast days for one place, in date order.
#[derive(Debug, Clone, Serialize)]
pub struct FlyingOutlook {
    pub place: Coordinates,
    pub records: Vec<WeatherRecord>,
    pub scores: Vec<ScoreBreakdown>,
}

impl FlyingOutlook {
    pub fn ranked(&self) -> Vec<&ScoreBreakdown> {
        DayRanker::rank(&self.scores)
    }

    pub fn best(&self) -> Option<&ScoreBreakdown> {
        DayRanker::best(&self.scores)
    }

    pub fn record_for(&self, date: NaiveDate) -> Option<&WeatherRecord> {
        self.records.iter().find(|r| r.date == date)
    }
}

// == Weather Service ==
#[derive(Debug, Clone)]
pub struct WeatherService {
    geocoder: GeocodingClient,
    forecast: ForecastClient,
    timeline: TimelineClient,
    engine: FlightScoringEngine,
    cache: Arc<CacheStore>,
}

impl WeatherService {
    /// Creates the service with a cache store built from `config.cache`.
    pub fn new(config: &Config) -> Result<Self> {
        let cache = Arc::new(CacheStore::from_settings(&config.cache));
        Self::with_cache(config, cache)
    }

    /// Creates the service around an existing cache store.
    pub fn with_cache(config: &Config, cache: Arc<CacheStore>) -> Result<Self> {
        let http = build_http_client(config.request_timeout)?;
        let fetcher = RetryingFetcher::from_config(config, Arc::clone(&cache));
        let ttl = &config.cache.ttl;

        Ok(Self {
            geocoder: GeocodingClient::new(
                http.clone(),
                fetcher.clone(),
                &config.endpoints.opencage,
                config.api_keys.opencage.clone(),
                ttl.for_type(CacheType::Coordinates),
            ),
            forecast: ForecastClient::new(
                http.clone(),
                fetcher.clone(),
                &config.endpoints.meteoblue,
                config.api_keys.meteoblue.clone(),
                ttl.for_type(CacheType::Weather),
            ),
            timeline: TimelineClient::new(
                http,
                fetcher,
                &config.endpoints.visualcrossing,
                config.api_keys.visualcrossing.clone(),
                ttl.for_type(CacheType::Historical),
                ttl.for_type(CacheType::Weather),
            ),
            engine: FlightScoringEngine::new(),
            cache,
        })
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub async fn locate(&self, query: &str) -> Result<Coordinates> {
        self.geocoder.geocode(query).await
    }

    /// Weather for `date` at `query`, judged against today's UTC date.
    pub async fn weather_for(&self, query: &str, date: NaiveDate) -> Result<WeatherReport> {
        self.weather_on(query, date, Utc::now().date_naive()).await
    }

    /// Weather for `date` relative to an explicit `today`.
    ///
    /// Past dates use the historical provider, today up to today + 6 the
    /// forecast provider.
    ///
    /// # Errors
    /// `DateOutOfRange` beyond the forecast horizon, checked before any
    /// network call.
    #[instrument(skip(self))]
    pub async fn weather_on(
        &self,
        query: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<WeatherReport> {
        let latest = latest_forecast_date(today);
        if date > latest {
            return Err(WeatherError::DateOutOfRange {
                requested: date,
                latest,
            });
        }

        let place = self.locate(query).await?;

        let records = if date < today {
            let payload = self.timeline.day(place.location(), date).await?;
            normalize_historical(&payload)?
        } else {
            let payload = self.forecast.hourly(place.location()).await?;
            normalize_forecast(&payload)?
        };

        let record = records
            .into_iter()
            .find(|r| r.date == date)
            .ok_or_else(|| WeatherError::MalformedPayload(format!("no data for {date}")))?;
        let score = self.engine.score(&record);
        info!(
            place = %place.name,
            %date,
            source = %record.source,
            score = score.final_score,
            "Weather report ready"
        );

        Ok(WeatherReport {
            place,
            record,
            score,
        })
    }

    /// Live conditions at `query`.
    #[instrument(skip(self))]
    pub async fn current_for(&self, query: &str) -> Result<WeatherReport> {
        let place = self.locate(query).await?;
        let payload = self
            .timeline
            .current(place.location(), Utc::now().date_naive())
            .await?;
        let record = normalize_current(&payload)?;
        let score = self.engine.score(&record);

        Ok(WeatherReport {
            place,
            record,
            score,
        })
    }

    /// Scores every forecast day from today through the horizon.
    pub async fn flying_outlook(&self, query: &str) -> Result<FlyingOutlook> {
        self.flying_outlook_on(query, Utc::now().date_naive()).await
    }

    #[instrument(skip(self))]
    pub async fn flying_outlook_on(&self, query: &str, today: NaiveDate) -> Result<FlyingOutlook> {
        let place = self.locate(query).await?;
        let payload = self.forecast.hourly(place.location()).await?;
        let latest = latest_forecast_date(today);

        let records: Vec<WeatherRecord> = normalize_forecast(&payload)?
            .into_iter()
            .filter(|r| (today..=latest).contains(&r.date))
            .collect();
        if records.is_empty() {
            return Err(WeatherError::MalformedPayload(format!(
                "forecast has no days between {today} and {latest}"
            )));
        }

        let scores = self.engine.score_all(&records);
        let outlook = FlyingOutlook {
            place,
            records,
            scores,
        };
        if let Some(best) = outlook.best() {
            info!(
                place = %outlook.place.name,
                best = %best.date,
                score = best.final_score,
                "Flying outlook ready"
            );
        }
        Ok(outlook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_forecast_date() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 28).unwrap();
        assert_eq!(
            latest_forecast_date(today),
            NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()
        );
    }

    #[tokio::test]
    async fn test_date_beyond_horizon_rejected_without_network() {
        // Unroutable endpoints: any network call would fail differently
        let mut config = Config::default();
        config.endpoints.opencage = "http://127.0.0.1:9".to_string();
        let service =
            WeatherService::with_cache(&config, Arc::new(CacheStore::disabled())).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let requested = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();

        let result = service.weather_on("Berlin", requested, today).await;

        match result {
            Err(WeatherError::DateOutOfRange { requested: r, latest }) => {
                assert_eq!(r, requested);
                assert_eq!(latest, NaiveDate::from_ymd_opt(2024, 6, 7).unwrap());
            }
            other => panic!("expected DateOutOfRange, got {other:?}"),
        }
    }
}
