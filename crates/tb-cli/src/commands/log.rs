//! Log command for recording time entries.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate};
use clap::Args;
use tb_core::TimeRecord;
use tb_core::duration::{from_hours, hours};
use tb_db::Database;

use super::util::parse_date;

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Project to bill the time to.
    #[arg(short, long)]
    pub project: String,

    /// What the time was spent on.
    #[arg(short, long)]
    pub activity: String,

    /// Time spent in hours; fractions allowed (e.g., 1.25).
    #[arg(long, conflicts_with = "minutes", required_unless_present = "minutes")]
    pub hours: Option<f64>,

    /// Time spent in minutes.
    #[arg(long)]
    pub minutes: Option<i64>,

    /// Day the work was done. Defaults to today.
    #[arg(long)]
    pub date: Option<String>,
}

impl LogArgs {
    fn duration(&self) -> Result<Duration> {
        let duration = match (self.hours, self.minutes) {
            (Some(h), _) => {
                if !h.is_finite() || h <= 0.0 {
                    bail!("hours must be a positive number, got {h}");
                }
                from_hours(h).context("hours out of range")?
            }
            (None, Some(m)) => {
                if m <= 0 {
                    bail!("minutes must be positive, got {m}");
                }
                Duration::try_minutes(m).context("minutes out of range")?
            }
            (None, None) => bail!("either --hours or --minutes is required"),
        };
        Ok(duration)
    }
}

/// Runs the log command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    args: &LogArgs,
    today: NaiveDate,
) -> Result<()> {
    let date = args
        .date
        .as_deref()
        .map_or(Ok(today), |s| parse_date(s, today))?;
    let record = TimeRecord::new(date, &args.project, &args.activity, args.duration()?)?;

    db.insert_time_entry(&record)?;
    tracing::info!(project = %record.project, activity = %record.activity, %date, "logged time");

    writeln!(
        writer,
        "Logged {:.2}h to {}/{} on {date}",
        hours(record.duration),
        record.project,
        record.activity
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    fn args(hours: Option<f64>, minutes: Option<i64>, date: Option<&str>) -> LogArgs {
        LogArgs {
            project: "acme".to_string(),
            activity: "design".to_string(),
            hours,
            minutes,
            date: date.map(String::from),
        }
    }

    /// Runs `tb log` as of 2025-02-03.
    fn log(db: &mut Database, args: &LogArgs) -> Result<String> {
        let mut output = Vec::new();
        run(&mut output, db, args, date(2, 3))?;
        Ok(String::from_utf8(output)?)
    }

    fn all_entries(db: &Database) -> Vec<TimeRecord> {
        db.list_time_entries(date(1, 1), date(12, 31)).unwrap()
    }

    #[test]
    fn log_records_fractional_hours() {
        let mut db = Database::open_in_memory().unwrap();

        let output = log(&mut db, &args(Some(1.25), None, Some("2025-01-06"))).unwrap();

        assert_eq!(output, "Logged 1.25h to acme/design on 2025-01-06\n");
        let entries = all_entries(&db);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, date(1, 6));
        assert_eq!(entries[0].duration, Duration::minutes(75));
    }

    #[test]
    fn log_defaults_to_today() {
        let mut db = Database::open_in_memory().unwrap();
        log(&mut db, &args(None, Some(40), None)).unwrap();

        let entries = all_entries(&db);
        assert_eq!(entries[0].date, date(2, 3));
        assert_eq!(entries[0].duration, Duration::minutes(40));
    }

    #[test]
    fn log_rejects_non_positive_time() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(log(&mut db, &args(Some(0.0), None, None)).is_err());
        assert!(log(&mut db, &args(Some(-1.5), None, None)).is_err());
        assert!(log(&mut db, &args(None, Some(-10), None)).is_err());
        assert!(all_entries(&db).is_empty());
    }

    #[test]
    fn log_rejects_more_than_a_day() {
        let mut db = Database::open_in_memory().unwrap();

        let err = log(&mut db, &args(Some(24.5), None, None)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "duration cannot exceed 24 hours, got 88200000ms"
        );
        assert!(log(&mut db, &args(None, Some(24 * 60 + 1), None)).is_err());

        // Storable as milliseconds, but two of them would overflow a summary
        assert!(log(&mut db, &args(Some(2e12), None, None)).is_err());
        let err = log(&mut db, &args(Some(3e12), None, None)).unwrap_err();
        assert_eq!(err.to_string(), "hours out of range");

        assert!(all_entries(&db).is_empty());
        assert!(log(&mut db, &args(Some(24.0), None, None)).is_ok());
    }

    #[test]
    fn log_rejects_blank_project() {
        let mut db = Database::open_in_memory().unwrap();
        let blank = LogArgs {
            project: "  ".to_string(),
            ..args(Some(1.0), None, None)
        };
        let err = log(&mut db, &blank).unwrap_err();
        assert_eq!(err.to_string(), "project cannot be empty");
    }
}
