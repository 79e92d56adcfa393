//! Flight Weather - weather queries and flying-day ranking
//!
//! Geocodes a place, fetches forecast or historical weather through a
//! cached, retrying fetch layer, and scores each day for light-aircraft
//! flying.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod providers;
pub mod retry;
pub mod scoring;
pub mod service;
pub mod tasks;
pub mod weather;

pub use config::Config;
pub use error::{ProviderError, Result, WeatherError};
pub use service::{FlyingOutlook, WeatherReport, WeatherService};
pub use tasks::spawn_cleanup_task;
