//! Flight Scoring Engine
//!
//! Starts every day at [`BASE_SCORE`] and applies one additive adjustment per
//! factor, in a fixed order. The final score is not clamped.

use chrono::NaiveDate;
use serde::Serialize;

use crate::weather::WeatherRecord;

pub const BASE_SCORE: f64 = 100.0;

const INSUFFICIENT_DATA: &str = "insufficient data";

// Temperature band (°C)
const TEMP_MIN_C: f64 = 10.0;
const TEMP_MAX_C: f64 = 25.0;
const TEMP_BONUS: f64 = 10.0;
const TEMP_PENALTY_PER_C: f64 = 2.0;

// Wind bands (km/h)
const WIND_CALM_KMH: f64 = 15.0;
const WIND_STRONG_KMH: f64 = 30.0;
const WIND_BONUS: f64 = 10.0;
const WIND_MODERATE_PENALTY_PER_KMH: f64 = 2.0;
const WIND_STRONG_BASE_PENALTY: f64 = 30.0;
const WIND_STRONG_PENALTY_PER_KMH: f64 = 4.0;

const DRY_BONUS: f64 = 5.0;
const PRECIP_PENALTY_PER_MM: f64 = 10.0;

const SNOW_PENALTY: f64 = 60.0;

// Cloud cover (%)
const CLOUD_CLEAR_PCT: f64 = 20.0;
const CLOUD_HEAVY_PCT: f64 = 60.0;
const CLOUD_BONUS: f64 = 5.0;
const CLOUD_PENALTY_PER_PCT: f64 = 0.5;

// Humidity (%)
const HUMIDITY_DRY_PCT: f64 = 50.0;
const HUMIDITY_BONUS: f64 = 5.0;
const HUMIDITY_PENALTY_PER_PCT: f64 = 0.2;

// Pressure band (hPa)
const PRESSURE_MIN_HPA: f64 = 1013.0;
const PRESSURE_MAX_HPA: f64 = 1025.0;
const PRESSURE_BONUS: f64 = 5.0;
const PRESSURE_PENALTY_PER_HPA: f64 = 0.5;

const VISIBILITY_PENALTY: f64 = 40.0;

// == Categories ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Unsuitable,
    Poor,
    Marginal,
    Good,
    Excellent,
}

impl Category {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Category::Excellent,
            s if s >= 75.0 => Category::Good,
            s if s >= 50.0 => Category::Marginal,
            s if s >= 25.0 => Category::Poor,
            _ => Category::Unsuitable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Excellent => "excellent",
            Category::Good => "good",
            Category::Marginal => "marginal",
            Category::Poor => "poor",
            Category::Unsuitable => "unsuitable",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored factors, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Temperature,
    Wind,
    Precipitation,
    Snowfall,
    CloudCover,
    Humidity,
    Pressure,
    Visibility,
}

impl Factor {
    pub const ALL: [Factor; 8] = [
        Factor::Temperature,
        Factor::Wind,
        Factor::Precipitation,
        Factor::Snowfall,
        Factor::CloudCover,
        Factor::Humidity,
        Factor::Pressure,
        Factor::Visibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Temperature => "temperature",
            Factor::Wind => "wind",
            Factor::Precipitation => "precipitation",
            Factor::Snowfall => "snowfall",
            Factor::CloudCover => "cloud_cover",
            Factor::Humidity => "humidity",
            Factor::Pressure => "pressure",
            Factor::Visibility => "visibility",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorAdjustment {
    pub factor: Factor,
    pub delta: f64,
    pub rationale: String,
}

impl FactorAdjustment {
    fn new(factor: Factor, delta: f64, rationale: impl Into<String>) -> Self {
        Self {
            factor,
            delta,
            rationale: rationale.into(),
        }
    }

    fn unknown(factor: Factor) -> Self {
        Self::new(factor, 0.0, INSUFFICIENT_DATA)
    }

    pub fn is_insufficient_data(&self) -> bool {
        self.rationale == INSUFFICIENT_DATA
    }
}

// == Score Breakdown ==
/// Auditable result of scoring one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub date: NaiveDate,
    pub base_score: f64,
    pub adjustments: Vec<FactorAdjustment>,
    pub final_score: f64,
    pub category: Category,
}

impl ScoreBreakdown {
    pub fn adjustment(&self, factor: Factor) -> Option<&FactorAdjustment> {
        self.adjustments.iter().find(|a| a.factor == factor)
    }

    /// Number of factors scored without data.
    pub fn insufficient_data(&self) -> usize {
        self.adjustments
            .iter()
            .filter(|a| a.is_insufficient_data())
            .count()
    }

    /// True when any factor lacked data, so the score may be too generous.
    pub fn is_reduced_confidence(&self) -> bool {
        self.insufficient_data() > 0
    }
}

// == Engine ==
/// Stateless scorer; the coefficient table lives in the constants above.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlightScoringEngine;

impl FlightScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, record: &WeatherRecord) -> ScoreBreakdown {
        let adjustments = vec![
            temperature(record.temperature_c),
            wind(record.wind_speed_kmh),
            precipitation(record.precipitation_mm),
            snowfall(record.snowfall_mm),
            cloud_cover(record.cloud_cover_pct),
            humidity(record.humidity_pct),
            pressure(record.pressure_hpa),
            visibility(record),
        ];
        let final_score = BASE_SCORE + adjustments.iter().map(|a| a.delta).sum::<f64>();

        ScoreBreakdown {
            date: record.date,
            base_score: BASE_SCORE,
            adjustments,
            final_score,
            category: Category::from_score(final_score),
        }
    }

    pub fn score_all(&self, records: &[WeatherRecord]) -> Vec<ScoreBreakdown> {
        records.iter().map(|r| self.score(r)).collect()
    }
}

fn temperature(value: Option<f64>) -> FactorAdjustment {
    let Some(t) = value else {
        return FactorAdjustment::unknown(Factor::Temperature);
    };
    if (TEMP_MIN_C..=TEMP_MAX_C).contains(&t) {
        return FactorAdjustment::new(
            Factor::Temperature,
            TEMP_BONUS,
            format!(
                "{t:.1} °C is within the comfortable {TEMP_MIN_C:.0}-{TEMP_MAX_C:.0} °C band"
            ),
        );
    }
    let (beyond, side) = if t < TEMP_MIN_C {
        (TEMP_MIN_C - t, "below")
    } else {
        (t - TEMP_MAX_C, "above")
    };
    FactorAdjustment::new(
        Factor::Temperature,
        -TEMP_PENALTY_PER_C * beyond,
        format!("{t:.1} °C is {beyond:.1} °C {side} the comfortable band"),
    )
}

fn wind(value: Option<f64>) -> FactorAdjustment {
    let Some(w) = value else {
        return FactorAdjustment::unknown(Factor::Wind);
    };
    if w < WIND_CALM_KMH {
        FactorAdjustment::new(Factor::Wind, WIND_BONUS, format!("light wind ({w:.1} km/h)"))
    } else if w <= WIND_STRONG_KMH {
        FactorAdjustment::new(
            Factor::Wind,
            -WIND_MODERATE_PENALTY_PER_KMH * (w - WIND_CALM_KMH),
            format!("moderate wind ({w:.1} km/h)"),
        )
    } else {
        FactorAdjustment::new(
            Factor::Wind,
            -WIND_STRONG_BASE_PENALTY - WIND_STRONG_PENALTY_PER_KMH * (w - WIND_STRONG_KMH),
            format!("strong wind ({w:.1} km/h)"),
        )
    }
}

fn precipitation(value: Option<f64>) -> FactorAdjustment {
    match value {
        None => FactorAdjustment::unknown(Factor::Precipitation),
        Some(p) if p <= 0.0 => {
            FactorAdjustment::new(Factor::Precipitation, DRY_BONUS, "no precipitation")
        }
        Some(p) => FactorAdjustment::new(
            Factor::Precipitation,
            -PRECIP_PENALTY_PER_MM * p,
            format!("{p:.1} mm of precipitation"),
        ),
    }
}

fn snowfall(value: Option<f64>) -> FactorAdjustment {
    match value {
        None => FactorAdjustment::unknown(Factor::Snowfall),
        Some(s) if s <= 0.0 => FactorAdjustment::new(Factor::Snowfall, 0.0, "no snowfall"),
        Some(s) => FactorAdjustment::new(
            Factor::Snowfall,
            -SNOW_PENALTY,
            format!("{s:.1} mm of snowfall"),
        ),
    }
}

fn cloud_cover(value: Option<f64>) -> FactorAdjustment {
    match value {
        None => FactorAdjustment::unknown(Factor::CloudCover),
        Some(c) if c < CLOUD_CLEAR_PCT => {
            FactorAdjustment::new(Factor::CloudCover, CLOUD_BONUS, format!("clear skies ({c:.0}%)"))
        }
        Some(c) if c <= CLOUD_HEAVY_PCT => {
            FactorAdjustment::new(Factor::CloudCover, 0.0, format!("partly cloudy ({c:.0}%)"))
        }
        Some(c) => FactorAdjustment::new(
            Factor::CloudCover,
            -CLOUD_PENALTY_PER_PCT * (c - CLOUD_HEAVY_PCT),
            format!("heavy cloud cover ({c:.0}%)"),
        ),
    }
}

fn humidity(value: Option<f64>) -> FactorAdjustment {
    match value {
        None => FactorAdjustment::unknown(Factor::Humidity),
        Some(h) if h < HUMIDITY_DRY_PCT => {
            FactorAdjustment::new(Factor::Humidity, HUMIDITY_BONUS, format!("dry air ({h:.0}%)"))
        }
        Some(h) => FactorAdjustment::new(
            Factor::Humidity,
            -HUMIDITY_PENALTY_PER_PCT * (h - HUMIDITY_DRY_PCT),
            format!("humid air ({h:.0}%)"),
        ),
    }
}

fn pressure(value: Option<f64>) -> FactorAdjustment {
    let Some(p) = value else {
        return FactorAdjustment::unknown(Factor::Pressure);
    };
    if (PRESSURE_MIN_HPA..=PRESSURE_MAX_HPA).contains(&p) {
        return FactorAdjustment::new(
            Factor::Pressure,
            PRESSURE_BONUS,
            format!("stable pressure ({p:.0} hPa)"),
        );
    }
    let outside = if p < PRESSURE_MIN_HPA {
        PRESSURE_MIN_HPA - p
    } else {
        p - PRESSURE_MAX_HPA
    };
    FactorAdjustment::new(
        Factor::Pressure,
        -PRESSURE_PENALTY_PER_HPA * outside,
        format!("pressure {p:.0} hPa is {outside:.0} hPa outside the stable band"),
    )
}

fn visibility(record: &WeatherRecord) -> FactorAdjustment {
    if !record.has_reduced_visibility() {
        return FactorAdjustment::new(Factor::Visibility, 0.0, "no fog or mist");
    }
    let cause = if record.fog { "fog" } else { "mist" };
    FactorAdjustment::new(
        Factor::Visibility,
        -VISIBILITY_PENALTY,
        format!("{cause} reduces visibility"),
    )
}
