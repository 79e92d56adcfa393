//! Weather Module
//!
//! Canonical per-day weather records and the normalizers that build them
//! from provider payloads.

mod normalizer;
mod record;

pub use normalizer::{normalize_current, normalize_forecast, normalize_historical};
pub use record::{estimate_visibility, Location, WeatherRecord, WeatherSource};
