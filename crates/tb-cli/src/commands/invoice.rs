//! Invoice command for billing a period's reconciled time.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Result, bail};
use chrono::{Duration, NaiveDate};
use clap::Args;
use tb_core::{Rate, TimeSummary, charge};
use tb_db::{Database, InvoiceRecord, NewInvoice};

use super::report::{format_row, generate_report_data};
use super::util::{PeriodArgs, format_amount, format_invoice_number, parse_rate, round_cents};
use crate::Config;

#[derive(Debug, Args)]
pub struct InvoiceArgs {
    #[command(flatten)]
    pub period: PeriodArgs,

    /// Hourly rate to bill at. Defaults to the configured rate.
    #[arg(long, value_parser = parse_rate)]
    pub rate: Option<Rate>,
}

/// Formats a stored invoice with one line per project.
pub fn format_invoice(invoice: &InvoiceRecord, summary: &TimeSummary, currency: &str) -> String {
    let mut output = String::new();

    writeln!(output, "INVOICE {}", format_invoice_number(invoice.number)).unwrap();
    writeln!(
        output,
        "Period: {} to {}",
        invoice.period_start, invoice.period_end
    )
    .unwrap();
    writeln!(output, "Rate:   {:.2} {currency}/h", invoice.rate).unwrap();
    writeln!(output).unwrap();

    for project in &summary.projects {
        let amount = format_amount(charge(project.time, invoice.rate), currency);
        writeln!(
            output,
            "{}",
            format_row(&project.name, project.time, Some(&amount))
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    let total = format_amount(invoice.amount, currency);
    writeln!(output, "{}", format_row("TOTAL", invoice.billed, Some(&total))).unwrap();

    output
}

/// Runs the invoice command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    args: &InvoiceArgs,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    let period = args.period.resolve(today)?;
    let rate = args.rate.unwrap_or(config.rate);
    if rate.is_zero() {
        bail!("no billing rate set; pass --rate or set `rate` in the config file");
    }

    let data = generate_report_data(db, period, rate, &config.currency)?;
    let billed = data.summary.total;
    if billed <= Duration::zero() {
        bail!("no billable time for period {period}");
    }

    let invoice = db.insert_invoice(&NewInvoice {
        period_start: period.start,
        period_end: period.end,
        rate: rate.value(),
        billed,
        amount: round_cents(charge(billed, rate.value())),
    })?;

    write!(
        writer,
        "{}",
        format_invoice(&invoice, &data.summary, &config.currency)
    )?;
    Ok(())
}
