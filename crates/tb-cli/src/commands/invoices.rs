//! Invoices command for listing invoices and their balances.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tb_core::duration::hours;
use tb_db::{Database, InvoiceRecord};

use super::util::{format_amount, format_hours, format_invoice_number, round_cents};
use crate::Config;

#[derive(Debug, Args)]
pub struct InvoicesArgs {
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// An invoice together with what has been paid against it.
#[derive(Debug, Clone)]
pub struct InvoiceStatus {
    pub invoice: InvoiceRecord,
    pub paid: f64,
}

impl InvoiceStatus {
    pub fn balance(&self) -> f64 {
        self.invoice.amount - self.paid
    }
}

/// Loads every invoice with its paid amount.
pub fn invoice_statuses(db: &Database) -> Result<Vec<InvoiceStatus>> {
    let mut statuses = Vec::new();
    for invoice in db.list_invoices()? {
        let paid = db.amount_paid(invoice.number)?;
        statuses.push(InvoiceStatus { invoice, paid });
    }
    Ok(statuses)
}

/// Formats the invoice list as a table.
pub fn format_invoices(statuses: &[InvoiceStatus], currency: &str) -> String {
    let mut output = String::new();

    if statuses.is_empty() {
        writeln!(output, "No invoices recorded.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<10}{:<26}{:>7}{:>14}{:>14}{:>14}",
        "NUMBER", "PERIOD", "HOURS", "AMOUNT", "PAID", "BALANCE"
    )
    .unwrap();
    for status in statuses {
        let invoice = &status.invoice;
        let period = format!("{} to {}", invoice.period_start, invoice.period_end);
        writeln!(
            output,
            "{:<10}{:<26}{:>7}{:>14}{:>14}{:>14}",
            format_invoice_number(invoice.number),
            period,
            format_hours(invoice.billed),
            format_amount(invoice.amount, currency),
            format_amount(status.paid, currency),
            format_amount(status.balance(), currency)
        )
        .unwrap();
    }

    output
}

/// JSON invoice entry.
#[derive(Debug, Serialize)]
pub struct JsonInvoice {
    pub number: String,
    pub period_start: String,
    pub period_end: String,
    pub hours: f64,
    pub rate: f64,
    pub amount: f64,
    pub paid: f64,
    pub balance: f64,
    pub created_at: String,
}

/// Formats the invoice list as JSON.
pub fn format_invoices_json(statuses: &[InvoiceStatus]) -> Result<String> {
    let invoices: Vec<_> = statuses
        .iter()
        .map(|status| JsonInvoice {
            number: format_invoice_number(status.invoice.number),
            period_start: status.invoice.period_start.to_string(),
            period_end: status.invoice.period_end.to_string(),
            hours: hours(status.invoice.billed),
            rate: status.invoice.rate,
            amount: round_cents(status.invoice.amount),
            paid: round_cents(status.paid),
            balance: round_cents(status.balance()),
            created_at: status.invoice.created_at.to_rfc3339(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&invoices)?)
}

/// Runs the invoices command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    args: &InvoicesArgs,
    config: &Config,
) -> Result<()> {
    let statuses = invoice_statuses(db)?;
    if args.json {
        writeln!(writer, "{}", format_invoices_json(&statuses)?)?;
    } else {
        write!(writer, "{}", format_invoices(&statuses, &config.currency))?;
    }
    Ok(())
}
