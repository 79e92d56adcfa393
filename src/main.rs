//! Flight Weather - command-line entry point
//!
//! Without a subcommand an interactive session starts; otherwise the
//! subcommand runs once and exits.

use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flight_weather::cache::CacheStore;
use flight_weather::cli::{
    error_message, parse_date_phrase, render_outlook, render_report, render_stats, CacheAction,
    Cli, Command, Session,
};
use flight_weather::{Config, WeatherService};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing (stderr, so stdout carries only answers)
/// 2. Load configuration from environment variables, then CLI overrides
/// 3. Validate the API keys of the providers the command uses
/// 4. Dispatch the subcommand or start the interactive session
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Defaults to "flight_weather=info", can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_weather=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate_for(cli.required_providers(Utc::now().date_naive()))?;
    info!(
        "Configuration loaded: cache_enabled={}, cache_dir={}, max_retries={}, timeout={:.1}s",
        config.cache.enabled,
        config.cache.directory.display(),
        config.retry.max_retries,
        config.request_timeout.as_secs_f64()
    );

    match cli.command {
        Some(Command::Cache { action }) => {
            run_cache_action(&config, action);
            Ok(ExitCode::SUCCESS)
        }
        Some(command) => {
            let service = WeatherService::new(&config)?;
            Ok(run_once(&service, &config, command).await)
        }
        None => {
            let service = WeatherService::new(&config)?;
            Session::new(service, config.default_location.clone(), config.cache.cleanup_interval)
                .run()
                .await
                .context("interactive session failed")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Runs one provider-backed subcommand and prints its answer.
async fn run_once(service: &WeatherService, config: &Config, command: Command) -> ExitCode {
    let today = Utc::now().date_naive();
    let outcome = match command {
        Command::Weather { location, date } => match parse_date_phrase(&date.join(" "), today) {
            Ok(date) => service
                .weather_on(&location, date, today)
                .await
                .map(|report| render_report(&report)),
            Err(e) => Err(e),
        },
        Command::Current { location } => service
            .current_for(location.as_deref().unwrap_or(&config.default_location))
            .await
            .map(|report| render_report(&report)),
        Command::Fly { location } => {
            let location = if location.is_empty() {
                config.default_location.clone()
            } else {
                location.join(" ")
            };
            service
                .flying_outlook_on(&location, today)
                .await
                .map(|outlook| render_outlook(&outlook))
        }
        Command::Cache { .. } => return ExitCode::FAILURE,
    };

    match outcome {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", error_message(&e));
            ExitCode::FAILURE
        }
    }
}

fn run_cache_action(config: &Config, action: CacheAction) {
    let store = CacheStore::from_settings(&config.cache);
    match action {
        CacheAction::Clear => println!("Removed {} cached responses", store.clear()),
        CacheAction::Purge => println!("Removed {} expired responses", store.purge_expired()),
        CacheAction::Stats => {
            // Counters are per process; the entry count reflects the directory
            print!(
                "{}",
                render_stats(&store.stats_snapshot(), store.len(), store.is_enabled())
            );
        }
    }
}
