//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{Days, NaiveDate};
use regex::Regex;

/// Pre-compiled regex for relative dates such as `+3d` or `-1d`.
static RELATIVE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])(\d+)d$").expect("relative date pattern is valid"));

/// Conservative bound for relative offsets (about ten years).
const MAX_RELATIVE_DAYS: u64 = 3650;

/// Parse a date as ISO 8601 or relative to `today`.
///
/// Supports:
/// - ISO 8601: "2026-03-02"
/// - Keywords: "today", "tomorrow", "yesterday"
/// - Offsets: "+3d", "-1d"
pub fn parse_date(s: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    match s.trim() {
        "today" => return Ok(today),
        "tomorrow" => return offset(today, '+', 1),
        "yesterday" => return offset(today, '-', 1),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
        return Ok(date);
    }

    let Some(caps) = RELATIVE_DATE_RE.captures(s.trim()) else {
        anyhow::bail!("Invalid date: {s}. Use YYYY-MM-DD, today, tomorrow, or an offset like +3d");
    };

    let days: u64 = caps[2]
        .parse()
        .context("failed to parse number in relative date")?;
    if days > MAX_RELATIVE_DAYS {
        anyhow::bail!("Relative date too far away: {s}");
    }
    let sign = if &caps[1] == "-" { '-' } else { '+' };
    offset(today, sign, days)
}

fn offset(today: NaiveDate, sign: char, days: u64) -> anyhow::Result<NaiveDate> {
    let shifted = if sign == '-' {
        today.checked_sub_days(Days::new(days))
    } else {
        today.checked_add_days(Days::new(days))
    };
    shifted.with_context(|| format!("date out of range: {today} {sign}{days}d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn test_parses_keywords_and_offsets() {
        assert_eq!(parse_date("today", today()).unwrap(), today());
        assert_eq!(
            parse_date("tomorrow", today()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
        assert_eq!(
            parse_date("yesterday", today()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
        assert_eq!(
            parse_date("+7d", today()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 8).unwrap()
        );
        assert_eq!(
            parse_date("-2d", today()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 27).unwrap()
        );
    }

    #[test]
    fn test_parses_iso_dates() {
        assert_eq!(
            parse_date("2026-12-24", today()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 24).unwrap()
        );
    }

    #[test]
    fn test_rejects_garbage_and_huge_offsets() {
        assert!(parse_date("next week", today()).is_err());
        assert!(parse_date("2026-13-01", today()).is_err());
        assert!(parse_date("+99999d", today()).is_err());
    }
}
