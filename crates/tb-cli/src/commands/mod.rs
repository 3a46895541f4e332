//! CLI subcommand implementations.

pub mod invoice;
pub mod invoices;
pub mod log;
pub mod pay;
pub mod report;
pub mod util;
