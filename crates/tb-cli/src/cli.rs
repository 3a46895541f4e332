//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::invoice::InvoiceArgs;
use crate::commands::invoices::InvoicesArgs;
use crate::commands::log::LogArgs;
use crate::commands::pay::PayArgs;
use crate::commands::report::ReportArgs;

/// Time billing.
///
/// Records time per project and activity, and reports and invoices it
/// rounded to tenths of an hour with subtotals that always add up.
#[derive(Debug, Parser)]
#[command(name = "tb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record time spent on a project activity.
    Log(LogArgs),

    /// Show reconciled hours and charges for a period.
    Report(ReportArgs),

    /// Create an invoice for a period.
    Invoice(InvoiceArgs),

    /// Record a payment against an invoice.
    Pay(PayArgs),

    /// List invoices with amounts paid and outstanding.
    Invoices(InvoicesArgs),
}
