//! Weather Record
//!
//! One day of weather at one place, in canonical units. Unknown
//! measurements are `None`, never zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Humidity at or above which mist is assumed (percent)
const MIST_HUMIDITY_PCT: f64 = 90.0;
/// Humidity at or above which fog is assumed when the air is calm (percent)
const FOG_HUMIDITY_PCT: f64 = 97.0;
/// Wind below which saturated air is treated as fog (km/h)
const FOG_MAX_WIND_KMH: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Which kind of upstream data a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSource {
    Forecast,
    Historical,
    Current,
}

impl WeatherSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherSource::Forecast => "forecast",
            WeatherSource::Historical => "historical",
            WeatherSource::Current => "current",
        }
    }
}

impl std::fmt::Display for WeatherSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Weather Record ==
/// Canonical daily weather record.
///
/// Built once by a normalizer (or the `with_*` builders in tests) and not
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    pub location: Location,
    pub source: WeatherSource,
    pub temperature_c: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub snowfall_mm: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
    pub fog: bool,
    pub mist: bool,
    /// Provider's condition summary, when it sends one
    pub conditions: Option<String>,
}

impl WeatherRecord {
    /// Creates a record with every measurement unknown.
    pub fn new(date: NaiveDate, location: Location, source: WeatherSource) -> Self {
        Self {
            date,
            location,
            source,
            temperature_c: None,
            wind_speed_kmh: None,
            wind_direction_deg: None,
            precipitation_mm: None,
            snowfall_mm: None,
            humidity_pct: None,
            pressure_hpa: None,
            cloud_cover_pct: None,
            fog: false,
            mist: false,
            conditions: None,
        }
    }

    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature_c = Some(celsius);
        self
    }

    pub fn with_wind(mut self, speed_kmh: f64, direction_deg: f64) -> Self {
        self.wind_speed_kmh = Some(speed_kmh);
        self.wind_direction_deg = Some(direction_deg);
        self
    }

    pub fn with_wind_speed(mut self, speed_kmh: f64) -> Self {
        self.wind_speed_kmh = Some(speed_kmh);
        self
    }

    pub fn with_precipitation(mut self, mm: f64) -> Self {
        self.precipitation_mm = Some(mm);
        self
    }

    pub fn with_snowfall(mut self, mm: f64) -> Self {
        self.snowfall_mm = Some(mm);
        self
    }

    pub fn with_humidity(mut self, pct: f64) -> Self {
        self.humidity_pct = Some(pct);
        self
    }

    pub fn with_pressure(mut self, hpa: f64) -> Self {
        self.pressure_hpa = Some(hpa);
        self
    }

    pub fn with_cloud_cover(mut self, pct: f64) -> Self {
        self.cloud_cover_pct = Some(pct);
        self
    }

    pub fn with_fog(mut self, fog: bool) -> Self {
        self.fog = fog;
        self
    }

    pub fn with_mist(mut self, mist: bool) -> Self {
        self.mist = mist;
        self
    }

    pub fn with_conditions(mut self, conditions: impl Into<String>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }

    /// True when visibility is reduced by fog or mist.
    pub fn has_reduced_visibility(&self) -> bool {
        self.fog || self.mist
    }

    /// Compass point for the wind direction, e.g. "NE".
    pub fn wind_compass(&self) -> Option<&'static str> {
        const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
        self.wind_direction_deg.map(|deg| {
            let index = ((deg.rem_euclid(360.0) + 22.5) / 45.0) as usize % POINTS.len();
            POINTS[index]
        })
    }
}

/// Derives `(fog, mist)` flags.
///
/// Condition text wins when it mentions fog, mist or haze. Otherwise the
/// flags are estimated from humidity and wind; unknown humidity yields
/// `(false, false)`.
pub fn estimate_visibility(
    conditions: Option<&str>,
    humidity_pct: Option<f64>,
    wind_speed_kmh: Option<f64>,
) -> (bool, bool) {
    if let Some(text) = conditions {
        let text = text.to_lowercase();
        let fog = text.contains("fog");
        let mist = text.contains("mist") || text.contains("haze");
        if fog || mist {
            return (fog, mist);
        }
    }

    match humidity_pct {
        Some(h)
            if h >= FOG_HUMIDITY_PCT && wind_speed_kmh.is_some_and(|w| w < FOG_MAX_WIND_KMH) =>
        {
            (true, false)
        }
        Some(h) if h >= MIST_HUMIDITY_PCT => (false, true),
        _ => (false, false),
    }
}
