//! Time billing CLI library.
//!
//! This crate provides the CLI interface for recording time, reporting
//! reconciled hours and tracking invoices.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
