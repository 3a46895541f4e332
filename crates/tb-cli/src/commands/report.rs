//! Report command for reconciled time summaries.
//!
//! This module implements `tb report`: the period's recorded time is
//! aggregated, rounded to tenths of an hour at every level, and printed with
//! charges in human-readable or JSON form.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Args;
use serde::Serialize;
use tb_core::duration::hours;
use tb_core::{Rate, TimeEntry, TimeSummary, charge};
use tb_db::Database;

use super::util::{Period, PeriodArgs, format_amount, format_hours, parse_rate, round_cents};
use crate::Config;

/// Width of the label column in tabular output.
const LABEL_WIDTH: usize = 30;

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub period: PeriodArgs,

    /// Hourly rate for charges. Defaults to the configured rate.
    #[arg(long, value_parser = parse_rate)]
    pub rate: Option<Rate>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub period: Period,
    pub rate: Rate,
    pub currency: String,
    /// Reconciled summary for the period.
    pub summary: TimeSummary,
}

/// Loads the period's time entries and reconciles them.
pub fn generate_report_data(
    db: &Database,
    period: Period,
    rate: Rate,
    currency: &str,
) -> Result<ReportData> {
    let records = db.list_time_entries(period.start, period.end)?;
    tracing::debug!(entry_count = records.len(), %period, "loaded time entries");

    let summary = TimeSummary::from_entries(&records)
        .rounded()
        .inspect_err(|e| tracing::warn!(error = %e, %period, "reconciliation failed"))
        .context("failed to reconcile rounded hours")?;

    Ok(ReportData {
        period,
        rate,
        currency: currency.to_string(),
        summary,
    })
}

/// Formats one table row: label, hours, and an optional amount.
pub(crate) fn format_row(label: &str, time: Duration, amount: Option<&str>) -> String {
    let mut row = format!("{label:<LABEL_WIDTH$}{:>7}", format_hours(time));
    if let Some(amount) = amount {
        write!(row, "{amount:>14}").unwrap();
    }
    row
}

/// Formats a row for any summary node, charging at `rate` when nonzero.
fn entry_row(label: &str, entry: &impl TimeEntry, rate: Rate, currency: &str) -> String {
    let amount = (!rate.is_zero())
        .then(|| format_amount(charge(entry.time(), rate.value()), currency));
    format_row(label, entry.time(), amount.as_deref())
}

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData) -> String {
    let mut output = String::new();

    writeln!(output, "TIME REPORT: {}", data.period).unwrap();
    if !data.rate.is_zero() {
        writeln!(output, "Rate: {} {}/h", data.rate, data.currency).unwrap();
    }

    if data.summary.projects.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "No time recorded for this period.").unwrap();
        return output;
    }

    writeln!(output).unwrap();
    for project in &data.summary.projects {
        writeln!(
            output,
            "{}",
            entry_row(&project.name, project, data.rate, &data.currency)
        )
        .unwrap();
        for detail in &project.details {
            let label = format!("  {}", detail.activity);
            writeln!(
                output,
                "{}",
                entry_row(&label, detail, data.rate, &data.currency)
            )
            .unwrap();
        }
    }

    writeln!(output).unwrap();
    writeln!(
        output,
        "{}",
        entry_row("TOTAL", &data.summary, data.rate, &data.currency)
    )
    .unwrap();

    output
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub period: JsonPeriod,
    pub rate: f64,
    pub currency: String,
    pub hours: f64,
    pub amount: f64,
    pub projects: Vec<JsonProject>,
}

#[derive(Debug, Serialize)]
pub struct JsonPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct JsonProject {
    pub name: String,
    pub hours: f64,
    pub amount: f64,
    pub details: Vec<JsonDetail>,
}

#[derive(Debug, Serialize)]
pub struct JsonDetail {
    pub activity: String,
    pub hours: f64,
    pub amount: f64,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let rate = data.rate.value();
    let amount = |time: Duration| round_cents(charge(time, rate));

    let report = JsonReport {
        period: JsonPeriod {
            start: data.period.start,
            end: data.period.end,
        },
        rate,
        currency: data.currency.clone(),
        hours: hours(data.summary.total),
        amount: amount(data.summary.total),
        projects: data
            .summary
            .projects
            .iter()
            .map(|project| JsonProject {
                name: project.name.clone(),
                hours: hours(project.time),
                amount: amount(project.time),
                details: project
                    .details
                    .iter()
                    .map(|detail| JsonDetail {
                        activity: detail.activity.clone(),
                        hours: hours(detail.time),
                        amount: amount(detail.time),
                    })
                    .collect(),
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    args: &ReportArgs,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    let period = args.period.resolve(today)?;
    let rate = args.rate.unwrap_or(config.rate);
    let data = generate_report_data(db, period, rate, &config.currency)?;

    if args.json {
        writeln!(writer, "{}", format_report_json(&data)?)?;
    } else {
        write!(writer, "{}", format_report(&data))?;
    }

    Ok(())
}
