//! Command-line surface
//!
//! clap definitions for the `flight-weather` binary, date-phrase parsing,
//! terminal rendering and the interactive session.

mod dates;
mod render;
mod session;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::{Config, Provider};

pub use dates::parse_date_phrase;
pub use render::{render_about, render_help, render_outlook, render_report, render_stats};
pub use session::{error_message, parse_command, Reply, Session, SessionCommand};

/// Weather and flying-conditions assistant
#[derive(Debug, Parser)]
#[command(name = "flight-weather")]
#[command(author, version, about = "Weather forecasts and flying-day rankings", long_about = None)]
pub struct Cli {
    /// Location used when a command names none
    #[arg(short = 'l', long = "location", global = true)]
    pub default_location: Option<String>,

    /// Bypass the response cache for this run
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Cache directory (overrides CACHE_DIRECTORY)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Weather for one day at a location
    ///
    /// Example: flight-weather weather Berlin tomorrow
    #[command(visible_aliases = ["w", "forecast"])]
    Weather {
        location: String,

        /// Date phrase, e.g. "next friday" or 2024-05-01 (default: today)
        #[arg(trailing_var_arg = true)]
        date: Vec<String>,
    },

    /// Current conditions at a location
    #[command(visible_alias = "now")]
    Current { location: Option<String> },

    /// Rank the coming days for flying
    #[command(visible_aliases = ["flying", "flight"])]
    Fly {
        #[arg(trailing_var_arg = true)]
        location: Vec<String>,
    },

    /// Inspect or maintain the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum CacheAction {
    /// Delete every cached response
    Clear,
    /// Delete expired responses only
    Purge,
    /// Show cache counters and size
    Stats,
}

impl Cli {
    /// Applies command-line overrides on top of the environment config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(location) = &self.default_location {
            config.default_location = location.clone();
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.directory = dir.clone();
        }
    }

    /// Providers whose API keys the command needs.
    ///
    /// A `weather` query for a past day uses the timeline service, any other
    /// day the forecast. An unparseable date needs nothing; it fails before
    /// any request.
    pub fn required_providers(&self, today: NaiveDate) -> &'static [Provider] {
        const FORECAST: &[Provider] = &[Provider::OpenCage, Provider::Meteoblue];
        const TIMELINE: &[Provider] = &[Provider::OpenCage, Provider::VisualCrossing];

        match &self.command {
            None => &Provider::ALL,
            Some(Command::Cache { .. }) => &[],
            Some(Command::Fly { .. }) => FORECAST,
            Some(Command::Current { .. }) => TIMELINE,
            Some(Command::Weather { date, .. }) => {
                match parse_date_phrase(&date.join(" "), today) {
                    Ok(day) if day < today => TIMELINE,
                    Ok(_) => FORECAST,
                    Err(_) => &[],
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    #[test]
    fn test_parse_weather_with_date_words() {
        let cli = Cli::try_parse_from(["flight-weather", "weather", "London", "next", "monday"])
            .unwrap();

        match cli.command {
            Some(Command::Weather { location, date }) => {
                assert_eq!(location, "London");
                assert_eq!(date.join(" "), "next monday");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_fly_multi_word_location() {
        let cli = Cli::try_parse_from(["flight-weather", "fly", "New", "York"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Fly { location }) if location.join(" ") == "New York"
        ));
    }

    #[test]
    fn test_parse_cache_actions() {
        let cli = Cli::try_parse_from(["flight-weather", "cache", "purge"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Cache {
                action: CacheAction::Purge
            })
        ));
        assert!(cli.required_providers(today()).is_empty());
    }

    #[test]
    fn test_no_subcommand_is_interactive() {
        let cli = Cli::try_parse_from(["flight-weather"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.required_providers(today()), &Provider::ALL);
    }

    #[test]
    fn test_required_providers_per_command() {
        let providers = |args: &[&str]| {
            let cli = Cli::try_parse_from(args).unwrap();
            cli.required_providers(today()).to_vec()
        };

        assert_eq!(
            providers(&["flight-weather", "fly", "Berlin"]),
            vec![Provider::OpenCage, Provider::Meteoblue]
        );
        assert_eq!(
            providers(&["flight-weather", "now"]),
            vec![Provider::OpenCage, Provider::VisualCrossing]
        );
        assert_eq!(
            providers(&["flight-weather", "weather", "Berlin", "tomorrow"]),
            vec![Provider::OpenCage, Provider::Meteoblue]
        );
        assert_eq!(
            providers(&["flight-weather", "weather", "Berlin", "yesterday"]),
            vec![Provider::OpenCage, Provider::VisualCrossing]
        );
        assert!(providers(&["flight-weather", "weather", "Berlin", "someday"]).is_empty());
    }

    #[test]
    fn test_fly_runs_without_timeline_key() {
        let cli = Cli::try_parse_from(["flight-weather", "fly", "Berlin"]).unwrap();
        let mut config = Config::default();
        config.api_keys.opencage = "geo".to_string();
        config.api_keys.meteoblue = "forecast".to_string();

        assert!(config.validate_for(cli.required_providers(today())).is_ok());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "flight-weather",
            "--no-cache",
            "--location",
            "Hamburg",
            "--cache-dir",
            "/tmp/fw",
        ])
        .unwrap();
        let mut config = Config::default();

        cli.apply(&mut config);

        assert!(!config.cache.enabled);
        assert_eq!(config.default_location, "Hamburg");
        assert_eq!(config.cache.directory, PathBuf::from("/tmp/fw"));
    }
}
