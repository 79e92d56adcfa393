//! Date Phrases
//!
//! Turns user phrases like "tomorrow", "next friday" or "in 3 days" into
//! calendar dates relative to a given `today`.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::{Result, WeatherError};

/// Parses a date phrase.
///
/// Accepted forms (case-insensitive):
/// - `today`, `now`, empty input
/// - `tomorrow`, `yesterday`, `next week`
/// - weekday names, optionally prefixed by `next`/`this` (next occurrence
///   after today) or `last` (most recent one before today)
/// - `in N days`, `N days ago`
/// - ISO `YYYY-MM-DD`
pub fn parse_date_phrase(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let phrase = input.trim().to_lowercase();
    let words: Vec<&str> = phrase.split_whitespace().collect();

    let date = match words.as_slice() {
        [] | ["today"] | ["now"] => Some(today),
        ["tomorrow"] => Some(today + Duration::days(1)),
        ["yesterday"] => Some(today - Duration::days(1)),
        ["next", "week"] => Some(today + Duration::days(7)),
        ["in", n, unit] if is_day_unit(unit) => {
            days(n).map(|n| today + Duration::days(n))
        }
        [n, unit, "ago"] if is_day_unit(unit) => days(n).map(|n| today - Duration::days(n)),
        ["next" | "this", day] => weekday(day).map(|d| next_weekday(today, d)),
        ["last", day] => weekday(day).map(|d| previous_weekday(today, d)),
        [day] => weekday(day)
            .map(|d| next_weekday(today, d))
            .or_else(|| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()),
        _ => None,
    };

    date.ok_or_else(|| WeatherError::InvalidDate(input.trim().to_string()))
}

fn is_day_unit(word: &str) -> bool {
    matches!(word, "day" | "days")
}

fn days(word: &str) -> Option<i64> {
    word.parse::<u16>().ok().map(i64::from)
}

fn weekday(word: &str) -> Option<Weekday> {
    word.parse::<Weekday>().ok()
}

/// First `target` strictly after `today`.
fn next_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let ahead = (7 + target.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        % 7;
    today + Duration::days(if ahead == 0 { 7 } else { ahead })
}

/// Last `target` strictly before `today`.
fn previous_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let behind = (7 + today.weekday().num_days_from_monday() as i64
        - target.num_days_from_monday() as i64)
        % 7;
    today - Duration::days(if behind == 0 { 7 } else { behind })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Wednesday
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn parse(input: &str) -> NaiveDate {
        parse_date_phrase(input, today()).unwrap()
    }

    #[test]
    fn test_simple_words() {
        assert_eq!(parse("today"), d(15));
        assert_eq!(parse(""), d(15));
        assert_eq!(parse("  Tomorrow "), d(16));
        assert_eq!(parse("yesterday"), d(14));
        assert_eq!(parse("next week"), d(22));
    }

    #[test]
    fn test_relative_days() {
        assert_eq!(parse("in 3 days"), d(18));
        assert_eq!(parse("in 1 day"), d(16));
        assert_eq!(parse("2 days ago"), d(13));
    }

    #[test]
    fn test_weekdays() {
        assert_eq!(parse("friday"), d(17));
        assert_eq!(parse("Fri"), d(17));
        assert_eq!(parse("next monday"), d(20));
        assert_eq!(parse("wednesday"), d(22));
        assert_eq!(parse("last wednesday"), d(8));
        assert_eq!(parse("last monday"), d(13));
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(parse("2023-01-10"), NaiveDate::from_ymd_opt(2023, 1, 10).unwrap());
    }

    #[test]
    fn test_unparseable_phrases() {
        for input in ["someday", "in many days", "next fortnight", "2024-13-40", "in -2 days"] {
            assert!(
                matches!(parse_date_phrase(input, today()), Err(WeatherError::InvalidDate(_))),
                "{input}"
            );
        }
    }
}
