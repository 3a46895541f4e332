//! Pay command for recording payments against invoices.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use tb_db::Database;

use super::util::{format_amount, format_invoice_number, parse_date, parse_invoice_number};
use crate::Config;

#[derive(Debug, Args)]
pub struct PayArgs {
    /// Invoice number (e.g., INV-0001 or 1).
    #[arg(value_parser = parse_invoice_number)]
    pub invoice: i64,

    /// Amount paid.
    pub amount: f64,

    /// Day the payment was received. Defaults to today.
    #[arg(long)]
    pub date: Option<String>,
}

/// Runs the pay command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    args: &PayArgs,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    if !args.amount.is_finite() || args.amount <= 0.0 {
        bail!("payment amount must be positive, got {}", args.amount);
    }
    let paid_on = args
        .date
        .as_deref()
        .map_or(Ok(today), |s| parse_date(s, today))?;

    db.insert_payment(args.invoice, paid_on, args.amount)?;
    let invoice = db.get_invoice(args.invoice)?;
    let balance = invoice.amount - db.amount_paid(args.invoice)?;

    writeln!(
        writer,
        "Recorded payment of {} for {} ({} outstanding)",
        format_amount(args.amount, &config.currency),
        format_invoice_number(args.invoice),
        format_amount(balance, &config.currency)
    )?;
    Ok(())
}
