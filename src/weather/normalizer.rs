//! Payload Normalizer
//!
//! Converts raw provider payloads into [`WeatherRecord`]s. All unit
//! conversions happen here:
//! - wind speed to km/h (Meteoblue declares its unit in `units.windspeed`)
//! - pressure to hPa (Meteoblue declares its unit in `units.pressure`)
//! - snow depth from cm to mm (Visual Crossing metric)

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::record::{estimate_visibility, Location, WeatherRecord, WeatherSource};
use crate::error::{Result, WeatherError};

const CM_TO_MM: f64 = 10.0;

// == Meteoblue (hourly forecast) ==
type Series = Option<Vec<Option<f64>>>;

#[derive(Debug, Deserialize)]
struct MeteoblueResponse {
    metadata: Option<MeteoblueMetadata>,
    #[serde(default)]
    units: MeteoblueUnits,
    data_1h: Option<MeteoblueHourly>,
}

#[derive(Debug, Deserialize)]
struct MeteoblueMetadata {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct MeteoblueUnits {
    windspeed: Option<String>,
    pressure: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeteoblueHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature: Series,
    #[serde(default)]
    windspeed: Series,
    #[serde(default)]
    winddirection: Series,
    #[serde(default)]
    precipitation: Series,
    #[serde(default)]
    snowfraction: Series,
    #[serde(default)]
    snowfall: Series,
    #[serde(default)]
    relativehumidity: Series,
    #[serde(default)]
    sealevelpressure: Series,
    #[serde(default)]
    pressure: Series,
    #[serde(default)]
    totalcloudcover: Series,
    #[serde(default)]
    cloudcover: Series,
}

/// Factor converting a Meteoblue wind unit to km/h.
fn wind_factor(unit: Option<&str>) -> Result<f64> {
    match unit.unwrap_or("ms-1") {
        "ms-1" | "m/s" => Ok(3.6),
        "kmh" | "km/h" => Ok(1.0),
        "kn" | "kt" => Ok(1.852),
        "mph" => Ok(1.609_344),
        other => Err(WeatherError::MalformedPayload(format!(
            "unsupported wind speed unit '{other}'"
        ))),
    }
}

/// Factor converting a Meteoblue pressure unit to hPa.
fn pressure_factor(unit: Option<&str>) -> Result<f64> {
    match unit.unwrap_or("hPa") {
        "hPa" | "hpa" | "mb" | "mbar" => Ok(1.0),
        "kPa" | "kpa" => Ok(10.0),
        "inHg" | "inhg" => Ok(33.8639),
        other => Err(WeatherError::MalformedPayload(format!(
            "unsupported pressure unit '{other}'"
        ))),
    }
}

/// Builds one record per calendar day from a Meteoblue `basic-1h` payload.
///
/// Days are returned in date order.
pub fn normalize_forecast(payload: &Value) -> Result<Vec<WeatherRecord>> {
    let response: MeteoblueResponse = decode(payload, "forecast")?;

    let location = response
        .metadata
        .as_ref()
        .and_then(|m| Some(Location::new(m.latitude?, m.longitude?)))
        .ok_or_else(|| missing("forecast", "metadata.latitude/longitude"))?;
    let hourly = response
        .data_1h
        .ok_or_else(|| missing("forecast", "data_1h"))?;
    if hourly.time.is_empty() {
        return Err(missing("forecast", "data_1h.time"));
    }
    let wind_to_kmh = wind_factor(response.units.windspeed.as_deref())?;
    let pressure_to_hpa = pressure_factor(response.units.pressure.as_deref())?;

    let mut days: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (index, stamp) in hourly.time.iter().enumerate() {
        let date = stamp
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| {
                WeatherError::MalformedPayload(format!("forecast: bad timestamp '{stamp}'"))
            })?;
        days.entry(date).or_default().push(index);
    }

    let pressure = hourly.sealevelpressure.as_ref().or(hourly.pressure.as_ref());
    let cloud = hourly.totalcloudcover.as_ref().or(hourly.cloudcover.as_ref());

    let records = days
        .into_iter()
        .map(|(date, hours)| {
            let wind_speed = mean(hourly.windspeed.as_ref(), &hours).map(|v| v * wind_to_kmh);
            let humidity = mean(hourly.relativehumidity.as_ref(), &hours);
            let snowfall = match hourly.snowfall.as_ref() {
                Some(series) => sum(Some(series), &hours),
                None => snow_from_fraction(
                    hourly.precipitation.as_ref(),
                    hourly.snowfraction.as_ref(),
                    &hours,
                ),
            };
            let (fog, mist) = estimate_visibility(None, humidity, wind_speed);

            WeatherRecord {
                temperature_c: mean(hourly.temperature.as_ref(), &hours),
                wind_speed_kmh: wind_speed,
                wind_direction_deg: circular_mean(hourly.winddirection.as_ref(), &hours),
                precipitation_mm: sum(hourly.precipitation.as_ref(), &hours),
                snowfall_mm: snowfall,
                humidity_pct: humidity,
                pressure_hpa: mean(pressure, &hours).map(|v| v * pressure_to_hpa),
                cloud_cover_pct: mean(cloud, &hours),
                fog,
                mist,
                ..WeatherRecord::new(date, location, WeatherSource::Forecast)
            }
        })
        .collect::<Vec<_>>();

    debug!(days = records.len(), "Normalized forecast payload");
    Ok(records)
}

// == Visual Crossing (timeline) ==
#[derive(Debug, Deserialize)]
struct TimelineResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    days: Vec<TimelineDay>,
    #[serde(rename = "currentConditions")]
    current_conditions: Option<TimelineConditions>,
}

#[derive(Debug, Deserialize)]
struct TimelineDay {
    datetime: Option<String>,
    #[serde(flatten)]
    values: TimelineConditions,
}

#[derive(Debug, Default, Deserialize)]
struct TimelineConditions {
    temp: Option<f64>,
    windspeed: Option<f64>,
    winddir: Option<f64>,
    precip: Option<f64>,
    /// Snow depth in cm
    snow: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
    cloudcover: Option<f64>,
    conditions: Option<String>,
}

impl TimelineConditions {
    fn into_record(
        self,
        date: NaiveDate,
        location: Location,
        source: WeatherSource,
    ) -> WeatherRecord {
        let (fog, mist) =
            estimate_visibility(self.conditions.as_deref(), self.humidity, self.windspeed);

        WeatherRecord {
            temperature_c: self.temp,
            wind_speed_kmh: self.windspeed,
            wind_direction_deg: self.winddir,
            precipitation_mm: self.precip,
            snowfall_mm: self.snow.map(|cm| cm * CM_TO_MM),
            humidity_pct: self.humidity,
            pressure_hpa: self.pressure,
            cloud_cover_pct: self.cloudcover,
            fog,
            mist,
            conditions: self.conditions,
            ..WeatherRecord::new(date, location, source)
        }
    }
}

impl TimelineResponse {
    fn location(&self) -> Result<Location> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Ok(Location::new(lat, lon)),
            _ => Err(missing("timeline", "latitude/longitude")),
        }
    }
}

fn parse_day(datetime: Option<&str>) -> Result<NaiveDate> {
    let raw = datetime.ok_or_else(|| missing("timeline", "days[].datetime"))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| WeatherError::MalformedPayload(format!("timeline: bad date '{raw}'")))
}

/// Builds one historical record per entry in `days`.
pub fn normalize_historical(payload: &Value) -> Result<Vec<WeatherRecord>> {
    let response: TimelineResponse = decode(payload, "timeline")?;
    let location = response.location()?;
    if response.days.is_empty() {
        return Err(missing("timeline", "days"));
    }

    response
        .days
        .into_iter()
        .map(|day| {
            let date = parse_day(day.datetime.as_deref())?;
            Ok(day.values.into_record(date, location, WeatherSource::Historical))
        })
        .collect()
}

/// Builds the record for `currentConditions`, dated by the first day entry.
pub fn normalize_current(payload: &Value) -> Result<WeatherRecord> {
    let response: TimelineResponse = decode(payload, "timeline")?;
    let location = response.location()?;
    let date = parse_day(response.days.first().and_then(|d| d.datetime.as_deref()))?;
    let current = response
        .current_conditions
        .ok_or_else(|| missing("timeline", "currentConditions"))?;

    Ok(current.into_record(date, location, WeatherSource::Current))
}

// == Helpers ==
fn decode<T: DeserializeOwned>(payload: &Value, what: &str) -> Result<T> {
    T::deserialize(payload)
        .map_err(|e| WeatherError::MalformedPayload(format!("{what}: {e}")))
}

fn missing(what: &str, field: &str) -> WeatherError {
    WeatherError::MalformedPayload(format!("{what}: missing {field}"))
}

fn known_values<'a>(
    series: Option<&'a Vec<Option<f64>>>,
    hours: &'a [usize],
) -> impl Iterator<Item = f64> + 'a {
    hours
        .iter()
        .filter_map(move |&i| series.and_then(|s| s.get(i).copied().flatten()))
}

fn mean(series: Option<&Vec<Option<f64>>>, hours: &[usize]) -> Option<f64> {
    let (total, count) =
        known_values(series, hours).fold((0.0, 0usize), |(t, c), v| (t + v, c + 1));
    (count > 0).then(|| total / count as f64)
}

fn sum(series: Option<&Vec<Option<f64>>>, hours: &[usize]) -> Option<f64> {
    let mut values = known_values(series, hours).peekable();
    values.peek()?;
    Some(values.sum())
}

/// Mean bearing in degrees, averaging unit vectors so 350° and 10° give 0°.
fn circular_mean(series: Option<&Vec<Option<f64>>>, hours: &[usize]) -> Option<f64> {
    let (sin, cos, count) = known_values(series, hours).fold((0.0, 0.0, 0usize), |(s, c, n), deg| {
        let rad = deg.to_radians();
        (s + rad.sin(), c + rad.cos(), n + 1)
    });
    if count == 0 {
        return None;
    }
    let deg = sin.atan2(cos).to_degrees().rem_euclid(360.0);
    // Snap float noise around north back to 0
    Some(if (360.0 - deg) < 1e-9 { 0.0 } else { deg })
}

/// Snow water from hourly precipitation times snow fraction.
fn snow_from_fraction(
    precipitation: Option<&Vec<Option<f64>>>,
    fraction: Option<&Vec<Option<f64>>>,
    hours: &[usize],
) -> Option<f64> {
    let (precipitation, fraction) = (precipitation?, fraction?);
    let mut known = false;
    let total = hours
        .iter()
        .filter_map(|&i| {
            let p = precipitation.get(i).copied().flatten()?;
            let f = fraction.get(i).copied().flatten()?;
            known = true;
            Some(p * f)
        })
        .sum::<f64>();
    known.then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Two days of hourly data with constant values per day.
    fn meteoblue_payload(units: Value) -> Value {
        let mut time = Vec::new();
        for day in ["2024-05-01", "2024-05-02"] {
            for hour in 0..24 {
                time.push(format!("{day} {hour:02}:00"));
            }
        }
        let per_day = |a: f64, b: f64| {
            let mut v = vec![a; 24];
            v.extend(vec![b; 24]);
            v
        };

        json!({
            "metadata": {"latitude": 52.52, "longitude": 13.41},
            "units": units,
            "data_1h": {
                "time": time,
                "temperature": per_day(18.0, 2.0),
                "windspeed": per_day(1.0, 10.0),
                "winddirection": per_day(90.0, 180.0),
                "precipitation": per_day(0.0, 0.5),
                "snowfraction": per_day(0.0, 1.0),
                "relativehumidity": per_day(40.0, 95.0),
                "sealevelpressure": per_day(1018.0, 1002.0),
                "totalcloudcover": per_day(10.0, 100.0)
            }
        })
    }

    #[test]
    fn test_forecast_groups_hours_by_day() {
        let records = normalize_forecast(&meteoblue_payload(json!({}))).unwrap();

        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.date, date(2024, 5, 1));
        assert_eq!(first.source, WeatherSource::Forecast);
        assert_eq!(first.location, Location::new(52.52, 13.41));
        assert_eq!(first.temperature_c, Some(18.0));
        assert_eq!(first.precipitation_mm, Some(0.0));
        assert_eq!(first.snowfall_mm, Some(0.0));
        assert_eq!(first.pressure_hpa, Some(1018.0));
        assert_eq!(first.cloud_cover_pct, Some(10.0));
        assert!(!first.fog && !first.mist);

        let second = &records[1];
        assert_eq!(second.date, date(2024, 5, 2));
        assert!((second.precipitation_mm.unwrap() - 12.0).abs() < 1e-9);
        assert!((second.snowfall_mm.unwrap() - 12.0).abs() < 1e-9);
        assert!(second.mist);
    }

    #[test]
    fn test_forecast_converts_wind_to_kmh() {
        let records =
            normalize_forecast(&meteoblue_payload(json!({"windspeed": "ms-1"}))).unwrap();
        assert!((records[0].wind_speed_kmh.unwrap() - 3.6).abs() < 1e-9);
        assert!((records[1].wind_speed_kmh.unwrap() - 36.0).abs() < 1e-9);

        let records =
            normalize_forecast(&meteoblue_payload(json!({"windspeed": "kmh"}))).unwrap();
        assert_eq!(records[1].wind_speed_kmh, Some(10.0));
    }

    #[test]
    fn test_forecast_converts_pressure_to_hpa() {
        let payload = |unit: &str, value: f64| {
            json!({
                "metadata": {"latitude": 1.0, "longitude": 2.0},
                "units": {"pressure": unit},
                "data_1h": {
                    "time": ["2024-05-01 00:00"],
                    "sealevelpressure": [value]
                }
            })
        };

        let kpa = normalize_forecast(&payload("kPa", 101.5)).unwrap();
        assert!((kpa[0].pressure_hpa.unwrap() - 1015.0).abs() < 1e-9);

        let inhg = normalize_forecast(&payload("inHg", 30.0)).unwrap();
        assert!((inhg[0].pressure_hpa.unwrap() - 1015.917).abs() < 1e-9);

        let hpa = normalize_forecast(&payload("hPa", 1013.0)).unwrap();
        assert_eq!(hpa[0].pressure_hpa, Some(1013.0));

        assert!(matches!(
            normalize_forecast(&payload("psi", 14.7)),
            Err(WeatherError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_forecast_missing_series_is_unknown() {
        let payload = json!({
            "metadata": {"latitude": 1.0, "longitude": 2.0},
            "data_1h": {
                "time": ["2024-05-01 00:00", "2024-05-01 01:00"],
                "temperature": [10.0, null]
            }
        });

        let records = normalize_forecast(&payload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].temperature_c, Some(10.0));
        assert_eq!(records[0].wind_speed_kmh, None);
        assert_eq!(records[0].precipitation_mm, None);
        assert_eq!(records[0].snowfall_mm, None);
        assert_eq!(records[0].humidity_pct, None);
    }

    #[test]
    fn test_forecast_prefers_explicit_snowfall() {
        let payload = json!({
            "metadata": {"latitude": 1.0, "longitude": 2.0},
            "data_1h": {
                "time": ["2024-05-01 00:00", "2024-05-01 01:00"],
                "precipitation": [1.0, 1.0],
                "snowfraction": [1.0, 1.0],
                "snowfall": [0.25, 0.25]
            }
        });

        let records = normalize_forecast(&payload).unwrap();
        assert_eq!(records[0].snowfall_mm, Some(0.5));
    }

    #[test]
    fn test_forecast_wind_direction_circular_mean() {
        let payload = json!({
            "metadata": {"latitude": 1.0, "longitude": 2.0},
            "data_1h": {
                "time": ["2024-05-01 00:00", "2024-05-01 01:00"],
                "winddirection": [350.0, 10.0]
            }
        });

        let direction = normalize_forecast(&payload).unwrap()[0].wind_direction_deg.unwrap();
        assert!(direction < 1e-6 || direction > 359.999_999);
    }

    #[test]
    fn test_forecast_malformed_payloads() {
        let no_location = json!({"data_1h": {"time": ["2024-05-01 00:00"]}});
        assert!(matches!(
            normalize_forecast(&no_location),
            Err(WeatherError::MalformedPayload(_))
        ));

        let no_data = json!({"metadata": {"latitude": 1.0, "longitude": 2.0}});
        assert!(matches!(
            normalize_forecast(&no_data),
            Err(WeatherError::MalformedPayload(_))
        ));

        let bad_time = json!({
            "metadata": {"latitude": 1.0, "longitude": 2.0},
            "data_1h": {"time": ["yesterday"]}
        });
        assert!(matches!(
            normalize_forecast(&bad_time),
            Err(WeatherError::MalformedPayload(_))
        ));

        let bad_unit = meteoblue_payload(json!({"windspeed": "furlongs"}));
        assert!(matches!(
            normalize_forecast(&bad_unit),
            Err(WeatherError::MalformedPayload(_))
        ));
    }

    fn timeline_payload() -> Value {
        json!({
            "latitude": 48.85,
            "longitude": 2.35,
            "days": [{
                "datetime": "2023-01-10",
                "temp": 2.0,
                "windspeed": 35.0,
                "winddir": 200.0,
                "precip": 0.0,
                "snow": 0.5,
                "humidity": 80.0,
                "pressure": 1008.0,
                "cloudcover": 90.0,
                "conditions": "Snow, Overcast"
            }],
            "currentConditions": {
                "temp": 4.0,
                "windspeed": 5.0,
                "humidity": 99.0,
                "conditions": "Fog"
            }
        })
    }

    #[test]
    fn test_historical_converts_snow_cm_to_mm() {
        let records = normalize_historical(&timeline_payload()).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.date, date(2023, 1, 10));
        assert_eq!(record.source, WeatherSource::Historical);
        assert_eq!(record.snowfall_mm, Some(5.0));
        assert_eq!(record.wind_speed_kmh, Some(35.0));
        assert_eq!(record.pressure_hpa, Some(1008.0));
        assert_eq!(record.conditions.as_deref(), Some("Snow, Overcast"));
        assert!(!record.fog && !record.mist);
    }

    #[test]
    fn test_historical_null_fields_stay_unknown() {
        let payload = json!({
            "latitude": 1.0,
            "longitude": 2.0,
            "days": [{"datetime": "2023-01-10", "temp": null}]
        });

        let record = &normalize_historical(&payload).unwrap()[0];
        assert_eq!(record.temperature_c, None);
        assert_eq!(record.snowfall_mm, None);
        assert_eq!(record.precipitation_mm, None);
    }

    #[test]
    fn test_historical_malformed_payloads() {
        let no_days = json!({"latitude": 1.0, "longitude": 2.0, "days": []});
        assert!(matches!(
            normalize_historical(&no_days),
            Err(WeatherError::MalformedPayload(_))
        ));

        let no_date = json!({"latitude": 1.0, "longitude": 2.0, "days": [{"temp": 3.0}]});
        assert!(matches!(
            normalize_historical(&no_date),
            Err(WeatherError::MalformedPayload(_))
        ));

        let no_location = json!({"days": [{"datetime": "2023-01-10"}]});
        assert!(matches!(
            normalize_historical(&no_location),
            Err(WeatherError::MalformedPayload(_))
        ));

        let wrong_type = json!({"latitude": "north", "longitude": 2.0});
        assert!(matches!(
            normalize_historical(&wrong_type),
            Err(WeatherError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_current_conditions() {
        let record = normalize_current(&timeline_payload()).unwrap();

        assert_eq!(record.source, WeatherSource::Current);
        assert_eq!(record.date, date(2023, 1, 10));
        assert_eq!(record.temperature_c, Some(4.0));
        assert!(record.fog);
        assert_eq!(record.cloud_cover_pct, None);
    }

    #[test]
    fn test_current_requires_current_conditions() {
        let mut payload = timeline_payload();
        payload.as_object_mut().unwrap().remove("currentConditions");

        assert!(matches!(
            normalize_current(&payload),
            Err(WeatherError::MalformedPayload(_))
        ));
    }
}
