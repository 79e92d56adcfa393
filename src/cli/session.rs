//! Interactive Session
//!
//! Line-oriented command loop on stdin/stdout. Logs go to stderr.

use chrono::{NaiveDate, Utc};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use super::dates::parse_date_phrase;
use super::render::{render_about, render_help, render_outlook, render_report};
use crate::error::{Result, WeatherError};
use crate::service::WeatherService;
use crate::tasks::spawn_cleanup_task;

const PROMPT: &str = "> ";

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Weather {
        location: Option<String>,
        date: String,
    },
    Current {
        location: Option<String>,
    },
    Fly {
        location: Option<String>,
    },
    Help,
    About,
    Exit,
    Empty,
    Unknown(String),
}

/// Parses one input line.
///
/// `weather <location> [date words…]` takes the first word as the location
/// and the rest as the date phrase. `fly` and `now` take all remaining words
/// as the location.
pub fn parse_command(line: &str) -> SessionCommand {
    let trimmed = line.trim();
    let mut words = trimmed.split_whitespace();
    let Some(head) = words.next() else {
        return SessionCommand::Empty;
    };
    let rest: Vec<&str> = words.collect();
    let joined = |parts: &[&str]| (!parts.is_empty()).then(|| parts.join(" "));

    match head.to_lowercase().as_str() {
        "exit" | "quit" | "bye" | "q" if rest.is_empty() => SessionCommand::Exit,
        "help" | "?" => SessionCommand::Help,
        "about" => SessionCommand::About,
        "weather" | "w" | "forecast" => SessionCommand::Weather {
            location: rest.first().map(|s| s.to_string()),
            date: rest.get(1..).map(|d| d.join(" ")).unwrap_or_default(),
        },
        "now" | "current" => SessionCommand::Current {
            location: joined(&rest),
        },
        "fly" | "flying" | "flight" | "f" => SessionCommand::Fly {
            location: joined(&rest),
        },
        _ => SessionCommand::Unknown(trimmed.to_string()),
    }
}

/// What the loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Continue(String),
    Exit(String),
}

// == Session ==
pub struct Session {
    service: WeatherService,
    default_location: String,
    cleanup_interval: u64,
}

impl Session {
    /// # Arguments
    /// * `default_location` - Used when a command names no location
    /// * `cleanup_interval` - Seconds between cache sweeps
    pub fn new(
        service: WeatherService,
        default_location: impl Into<String>,
        cleanup_interval: u64,
    ) -> Self {
        Self {
            service,
            default_location: default_location.into(),
            cleanup_interval,
        }
    }

    /// Runs until `exit` or end of input.
    pub async fn run(&self) -> std::io::Result<()> {
        let sweeper = spawn_cleanup_task(self.service.cache().clone(), self.cleanup_interval);
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        stdout
            .write_all(b"Flight weather assistant. Type 'help' for commands.\n")
            .await?;

        let result = loop {
            stdout.write_all(PROMPT.as_bytes()).await?;
            stdout.flush().await?;

            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            let reply = self.respond(parse_command(&line), Utc::now().date_naive()).await;
            let (text, done) = match reply {
                Reply::Continue(text) => (text, false),
                Reply::Exit(text) => (text, true),
            };
            if !text.is_empty() {
                stdout.write_all(text.as_bytes()).await?;
                if !text.ends_with('\n') {
                    stdout.write_all(b"\n").await?;
                }
            }
            if done {
                break Ok(());
            }
        };

        sweeper.abort();
        info!("Session ended");
        result
    }

    /// Produces the reply for one command. Errors become user messages.
    pub async fn respond(&self, command: SessionCommand, today: NaiveDate) -> Reply {
        let outcome = match command {
            SessionCommand::Exit => return Reply::Exit("Goodbye, and blue skies!".to_string()),
            SessionCommand::Empty => return Reply::Continue(String::new()),
            SessionCommand::Help => Ok(render_help()),
            SessionCommand::About => Ok(render_about()),
            SessionCommand::Unknown(text) => Ok(format!(
                "I don't understand '{text}'. Type 'help' for the list of commands."
            )),
            SessionCommand::Weather { location, date } => {
                self.weather(location.as_deref(), &date, today).await
            }
            SessionCommand::Current { location } => self
                .service
                .current_for(self.location(location.as_deref()))
                .await
                .map(|report| render_report(&report)),
            SessionCommand::Fly { location } => self
                .service
                .flying_outlook_on(self.location(location.as_deref()), today)
                .await
                .map(|outlook| render_outlook(&outlook)),
        };

        Reply::Continue(outcome.unwrap_or_else(|e| {
            warn!(error = %e, "Command failed");
            format!("Error: {}", e.user_message())
        }))
    }

    async fn weather(
        &self,
        location: Option<&str>,
        date: &str,
        today: NaiveDate,
    ) -> Result<String> {
        let date = parse_date_phrase(date, today)?;
        let report = self
            .service
            .weather_on(self.location(location), date, today)
            .await?;
        Ok(render_report(&report))
    }

    fn location<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.default_location)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("default_location", &self.default_location)
            .field("cleanup_interval", &self.cleanup_interval)
            .finish_non_exhaustive()
    }
}

/// Message for an error that ends a one-shot command.
pub fn error_message(err: &WeatherError) -> String {
    format!("Error: {}", err.user_message())
}
