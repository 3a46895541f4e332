use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tb_cli::commands::{invoice, invoices, log, pay, report};
use tb_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(tb_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = tb_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so JSON output on stdout stays parseable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let today = Local::now().date_naive();
    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Log(args)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            log::run(&mut stdout, &mut db, args, today)?;
        }
        Some(Commands::Report(args)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            report::run(&mut stdout, &db, args, &config, today)?;
        }
        Some(Commands::Invoice(args)) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            invoice::run(&mut stdout, &mut db, args, &config, today)?;
        }
        Some(Commands::Pay(args)) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            pay::run(&mut stdout, &mut db, args, &config, today)?;
        }
        Some(Commands::Invoices(args)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            invoices::run(&mut stdout, &db, args, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
