//! Text rendering for the terminal.

use std::fmt::Write;

use crate::cache::CacheStats;
use crate::scoring::{Category, ScoreBreakdown};
use crate::service::{FlyingOutlook, WeatherReport};
use crate::weather::{WeatherRecord, WeatherSource};

fn title(out: &mut String, text: &str) {
    let _ = writeln!(out, "=== {text} ===\n");
}

fn value(reading: Option<f64>, unit: &str, decimals: usize) -> String {
    match reading {
        Some(v) => format!("{v:.decimals$} {unit}").trim_end().to_string(),
        None => "n/a".to_string(),
    }
}

fn category_hint(category: Category) -> &'static str {
    match category {
        Category::Excellent => "excellent flying conditions",
        Category::Good => "good flying conditions",
        Category::Marginal => "marginal, check details before departure",
        Category::Poor => "poor, flying not recommended",
        Category::Unsuitable => "unsuitable for flying",
    }
}

pub fn render_record(out: &mut String, record: &WeatherRecord) {
    let wind = match (record.wind_speed_kmh, record.wind_compass()) {
        (Some(speed), Some(dir)) => format!("{speed:.1} km/h from {dir}"),
        (speed, _) => value(speed, "km/h", 1),
    };
    let visibility = match (record.fog, record.mist) {
        (true, _) => "fog",
        (false, true) => "mist",
        (false, false) => "no fog or mist",
    };

    if let Some(conditions) = &record.conditions {
        let _ = writeln!(out, "Conditions:    {conditions}");
    }
    let _ = writeln!(out, "Temperature:   {}", value(record.temperature_c, "°C", 1));
    let _ = writeln!(out, "Wind:          {wind}");
    let _ = writeln!(out, "Precipitation: {}", value(record.precipitation_mm, "mm", 1));
    let _ = writeln!(out, "Snowfall:      {}", value(record.snowfall_mm, "mm", 1));
    let _ = writeln!(out, "Humidity:      {}", value(record.humidity_pct, "%", 0));
    let _ = writeln!(out, "Pressure:      {}", value(record.pressure_hpa, "hPa", 0));
    let _ = writeln!(out, "Cloud cover:   {}", value(record.cloud_cover_pct, "%", 0));
    let _ = writeln!(out, "Visibility:    {visibility}");
}

pub fn render_breakdown(out: &mut String, breakdown: &ScoreBreakdown) {
    let _ = writeln!(
        out,
        "Flying score:  {:.1} ({}: {})",
        breakdown.final_score,
        breakdown.category,
        category_hint(breakdown.category)
    );
    for adjustment in &breakdown.adjustments {
        let _ = writeln!(
            out,
            "  {:<14} {:>+7.1}  {}",
            adjustment.factor.as_str(),
            adjustment.delta,
            adjustment.rationale
        );
    }
    if breakdown.is_reduced_confidence() {
        let _ = writeln!(
            out,
            "Warning: {} of {} factors had no data; the score may be too optimistic.",
            breakdown.insufficient_data(),
            breakdown.adjustments.len()
        );
    }
}

pub fn render_report(report: &WeatherReport) -> String {
    let mut out = String::new();
    let kind = match report.record.source {
        WeatherSource::Forecast => "Forecast",
        WeatherSource::Historical => "Historical weather",
        WeatherSource::Current => "Current conditions",
    };
    let date = report.record.date.format("%A, %d %B %Y");
    title(&mut out, &format!("{kind} for {} on {date}", report.place.name));
    render_record(&mut out, &report.record);
    out.push('\n');
    render_breakdown(&mut out, &report.score);
    out
}

pub fn render_outlook(outlook: &FlyingOutlook) -> String {
    let mut out = String::new();
    title(&mut out, &format!("Flying outlook for {}", outlook.place.name));

    for (rank, breakdown) in outlook.ranked().into_iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {}  {:>6.1}  {}{}",
            rank + 1,
            breakdown.date.format("%a %Y-%m-%d"),
            breakdown.final_score,
            breakdown.category,
            if breakdown.is_reduced_confidence() { "  (limited data)" } else { "" }
        );
    }

    if let Some(best) = outlook.best() {
        out.push('\n');
        let _ = writeln!(out, "Best day: {}", best.date.format("%A, %d %B %Y"));
        if let Some(record) = outlook.record_for(best.date) {
            render_record(&mut out, record);
        }
        out.push('\n');
        render_breakdown(&mut out, best);
    }
    out.push_str("\nScores are a heuristic, not a substitute for an official briefing.\n");
    out
}

pub fn render_stats(stats: &CacheStats, entries: usize, enabled: bool) -> String {
    let mut out = String::new();
    title(&mut out, "Cache statistics");
    let _ = writeln!(out, "Enabled:        {}", if enabled { "yes" } else { "no" });
    let _ = writeln!(out, "Entries:        {entries}");
    let _ = writeln!(out, "Hits:           {}", stats.hits);
    let _ = writeln!(out, "Misses:         {}", stats.misses);
    let _ = writeln!(out, "Hit rate:       {:.1}%", stats.hit_rate() * 100.0);
    let _ = writeln!(out, "Writes:         {}", stats.writes);
    let _ = writeln!(out, "Write failures: {}", stats.write_failures);
    let _ = writeln!(out, "Purged:         {}", stats.purged);
    out
}

pub fn render_help() -> String {
    let mut out = String::new();
    title(&mut out, "Commands");
    out.push_str(
        "weather <location> [date]   Weather for a day (aliases: w, forecast)\n\
         now [location]              Current conditions (alias: current)\n\
         fly [location]              Rank the next 7 days for flying (aliases: flying, flight, f)\n\
         help                        Show this help\n\
         about                       About this tool\n\
         exit                        Leave (aliases: quit, bye, q)\n\n\
         Dates: today, tomorrow, yesterday, next week, friday, next monday,\n\
         last sunday, in 3 days, 2 days ago, 2024-05-01\n",
    );
    out
}

pub fn render_about() -> String {
    let mut out = String::new();
    title(&mut out, "About");
    let _ = writeln!(out, "flight-weather {}", env!("CARGO_PKG_VERSION"));
    out.push_str(
        "Weather forecasts, history and a flying-suitability score for light aircraft.\n\
         Data: OpenCage (geocoding), Meteoblue (forecast), Visual Crossing (history).\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Coordinates;
    use crate::scoring::FlightScoringEngine;
    use crate::weather::Location;
    use chrono::NaiveDate;

    fn report() -> WeatherReport {
        let record = WeatherRecord::new(
            NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
            Location::new(52.52, 13.41),
            WeatherSource::Forecast,
        )
        .with_temperature(18.0)
        .with_wind(8.0, 90.0);
        let score = FlightScoringEngine::new().score(&record);
        WeatherReport {
            place: Coordinates {
                lat: 52.52,
                lon: 13.41,
                name: "Berlin, Germany".to_string(),
            },
            record,
            score,
        }
    }

    #[test]
    fn test_report_mentions_place_and_unknowns() {
        let text = render_report(&report());

        assert!(text.contains("Forecast for Berlin, Germany on Friday, 17 May 2024"));
        assert!(text.contains("18.0 °C"));
        assert!(text.contains("8.0 km/h from E"));
        assert!(text.contains("Humidity:      n/a"));
        assert!(text.contains("insufficient data"));
        assert!(text.contains("Warning: 5 of 8 factors had no data"), "{text}");
    }

    #[test]
    fn test_outlook_lists_ranked_days() {
        let base = report();
        let mut windy = base.record.clone();
        windy.date = NaiveDate::from_ymd_opt(2024, 5, 18).unwrap();
        windy.wind_speed_kmh = Some(45.0);
        let engine = FlightScoringEngine::new();
        let outlook = FlyingOutlook {
            place: base.place.clone(),
            scores: vec![engine.score(&windy), base.score.clone()],
            records: vec![windy, base.record.clone()],
        };

        let text = render_outlook(&outlook);

        let first = text.find("2024-05-17").unwrap();
        let second = text.find("2024-05-18").unwrap();
        assert!(first < second);
        assert!(text.contains("Best day: Friday, 17 May 2024"));
        assert!(text.contains("(limited data)"));
    }

    #[test]
    fn test_stats_rendering() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        let text = render_stats(&stats, 2, true);
        assert!(text.contains("Hit rate:       75.0%"));
        assert!(text.contains("Entries:        2"));
    }
}
