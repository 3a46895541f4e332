//! Shared utilities for CLI commands.

use std::fmt;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Days, Duration, NaiveDate};
use clap::Args;
use regex::Regex;
use tb_core::Rate;
use tb_core::duration::hours;

/// Pre-compiled regex for relative date parsing.
static RELATIVE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(day|week)s?\s+ago$").unwrap());

/// Conservative bound for relative date parsing (~1000 years in days).
const MAX_RELATIVE_DAYS: u64 = 1000 * 365;

/// Parse a date as ISO 8601, a keyword, or a relative offset from `today`.
///
/// Supports:
/// - ISO 8601: "2025-01-15"
/// - Keywords: "today", "yesterday"
/// - Relative: "3 days ago", "2 weeks ago"
pub fn parse_date(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    let s = s.trim();
    match s {
        "today" => return Ok(today),
        "yesterday" => return today.pred_opt().context("date out of range"),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    let Some(caps) = RELATIVE_DATE_RE.captures(s) else {
        bail!("Invalid date: {s}. Use YYYY-MM-DD, 'today', 'yesterday' or relative (e.g., '3 days ago')");
    };

    let n: u64 = caps[1]
        .parse()
        .context("failed to parse number in relative date")?;
    let days_per_unit = match &caps[2] {
        "day" => 1,
        "week" => 7,
        unit => bail!("Unknown date unit: {unit}"),
    };
    if n > MAX_RELATIVE_DAYS / days_per_unit {
        bail!("Relative date too far back: {s}");
    }

    today
        .checked_sub_days(Days::new(n * days_per_unit))
        .context("date out of range")
}

/// Returns the first and last day of the calendar month before `today`.
pub fn previous_month(today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let this_month = today.with_day(1).context("date out of range")?;
    let end = this_month.pred_opt().context("date out of range")?;
    let start = end.with_day(1).context("date out of range")?;
    Ok((start, end))
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Period selection shared by reporting commands.
#[derive(Debug, Clone, Default, Args)]
pub struct PeriodArgs {
    /// First day of the period (YYYY-MM-DD, "today", "yesterday" or "N days ago").
    /// Defaults to the first day of last month.
    #[arg(long)]
    pub from: Option<String>,

    /// Last day of the period, inclusive. Defaults to the last day of last month.
    #[arg(long)]
    pub to: Option<String>,
}

impl PeriodArgs {
    /// Resolves the requested period relative to `today`.
    ///
    /// With neither bound the period is last month. A lone `--from` runs to
    /// today; a lone `--to` starts at the first of its month.
    pub fn resolve(&self, today: NaiveDate) -> Result<Period> {
        let from = self
            .from
            .as_deref()
            .map(|s| parse_date(s, today))
            .transpose()?;
        let to = self
            .to
            .as_deref()
            .map(|s| parse_date(s, today))
            .transpose()?;

        let (start, end) = match (from, to) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => (start, today),
            (None, Some(end)) => (end.with_day(1).context("date out of range")?, end),
            (None, None) => previous_month(today)?,
        };

        if start > end {
            bail!("period start {start} is after its end {end}");
        }
        Ok(Period { start, end })
    }
}

/// Parses a billing rate argument.
pub fn parse_rate(s: &str) -> Result<Rate, String> {
    let value: f64 = s.parse().map_err(|_| format!("invalid rate: {s}"))?;
    Rate::new(value).map_err(|e| e.to_string())
}

/// Parses an invoice number given as `INV-0001` or `1`.
pub fn parse_invoice_number(s: &str) -> Result<i64, String> {
    let digits = s
        .strip_prefix("INV-")
        .or_else(|| s.strip_prefix("inv-"))
        .unwrap_or(s);
    match digits.parse::<i64>() {
        Ok(number) if number > 0 => Ok(number),
        _ => Err(format!("invalid invoice number: {s}")),
    }
}

/// Formats an invoice number for display.
pub fn format_invoice_number(number: i64) -> String {
    format!("INV-{number:04}")
}

/// Formats a duration as tenths of an hour, e.g. "2.3h".
pub fn format_hours(duration: Duration) -> String {
    format!("{:.1}h", hours(duration))
}

/// Formats an amount with two decimals and a currency label.
pub fn format_amount(amount: f64, currency: &str) -> String {
    format!("{amount:.2} {currency}")
}

/// Rounds an amount to whole cents for machine-readable output.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_parse_date_iso() {
        let today = date(2025, 2, 14);
        assert_eq!(parse_date("2025-01-06", today).unwrap(), date(2025, 1, 6));
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = date(2025, 3, 1);
        assert_eq!(parse_date("today", today).unwrap(), today);
        assert_eq!(parse_date("yesterday", today).unwrap(), date(2025, 2, 28));
    }

    #[test]
    fn test_parse_date_relative() {
        let today = date(2025, 2, 14);
        assert_eq!(parse_date("3 days ago", today).unwrap(), date(2025, 2, 11));
        assert_eq!(parse_date("1 day ago", today).unwrap(), date(2025, 2, 13));
        assert_eq!(parse_date("2 weeks ago", today).unwrap(), date(2025, 1, 31));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        let today = date(2025, 2, 14);
        assert!(parse_date("next tuesday", today).is_err());
        assert!(parse_date("2025-13-01", today).is_err());
        assert!(parse_date("999999999 weeks ago", today).is_err());
    }

    #[test]
    fn test_previous_month_mid_year() {
        let (start, end) = previous_month(date(2025, 7, 15)).unwrap();
        assert_eq!(start, date(2025, 6, 1));
        assert_eq!(end, date(2025, 6, 30));
    }

    #[test]
    fn test_previous_month_crosses_year_and_leap_day() {
        let (start, end) = previous_month(date(2025, 1, 1)).unwrap();
        assert_eq!((start, end), (date(2024, 12, 1), date(2024, 12, 31)));

        let (start, end) = previous_month(date(2024, 3, 31)).unwrap();
        assert_eq!((start, end), (date(2024, 2, 1), date(2024, 2, 29)));
    }

    #[test]
    fn test_period_defaults_to_last_month() {
        let period = PeriodArgs::default().resolve(date(2025, 2, 14)).unwrap();
        assert_eq!(period.start, date(2025, 1, 1));
        assert_eq!(period.end, date(2025, 1, 31));
        assert_eq!(period.to_string(), "2025-01-01 to 2025-01-31");
    }

    #[test]
    fn test_period_with_single_bound() {
        let today = date(2025, 2, 14);
        let from_only = PeriodArgs {
            from: Some("2025-02-03".to_string()),
            to: None,
        };
        assert_eq!(
            from_only.resolve(today).unwrap(),
            Period {
                start: date(2025, 2, 3),
                end: today
            }
        );

        let to_only = PeriodArgs {
            from: None,
            to: Some("2024-11-20".to_string()),
        };
        assert_eq!(
            to_only.resolve(today).unwrap(),
            Period {
                start: date(2024, 11, 1),
                end: date(2024, 11, 20)
            }
        );
    }

    #[test]
    fn test_period_rejects_reversed_bounds() {
        let args = PeriodArgs {
            from: Some("2025-02-10".to_string()),
            to: Some("2025-02-01".to_string()),
        };
        assert!(args.resolve(date(2025, 2, 14)).is_err());
    }

    #[test]
    fn test_parse_invoice_number_forms() {
        assert_eq!(parse_invoice_number("INV-0007"), Ok(7));
        assert_eq!(parse_invoice_number("inv-12"), Ok(12));
        assert_eq!(parse_invoice_number("3"), Ok(3));
        assert!(parse_invoice_number("INV-0").is_err());
        assert!(parse_invoice_number("seven").is_err());
    }

    #[test]
    fn test_format_invoice_number_pads() {
        assert_eq!(format_invoice_number(7), "INV-0007");
        assert_eq!(format_invoice_number(12_345), "INV-12345");
    }

    #[test]
    fn test_format_hours_and_amounts() {
        assert_eq!(format_hours(Duration::minutes(138)), "2.3h");
        assert_eq!(format_hours(Duration::zero()), "0.0h");
        assert_eq!(format_amount(229.999_999_999_999_97, "USD"), "230.00 USD");
        assert_eq!(format_amount(0.0, "EUR"), "0.00 EUR");
    }

    #[test]
    fn test_round_cents() {
        assert!((round_cents(229.999_999_999_999_97) - 230.0).abs() < f64::EPSILON);
        assert!((round_cents(12.345_6) - 12.35).abs() < 1e-9);
    }
}
