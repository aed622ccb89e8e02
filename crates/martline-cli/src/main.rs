//! martline - batch ETL for the marketplace datasets
//!
//! Extracts headerless CSV sources, cleans them per dataset definition,
//! mirrors the clean data to CSV files and loads raw and clean tables
//! into DuckDB.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "martline")]
#[command(about = "Batch ETL for marketplace datasets into DuckDB")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./martline.toml or ~/.config/martline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Read timeout in seconds for stall detection
    #[arg(long, global = true)]
    read_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Run dataset pipelines (extract, clean, persist, load)
    Run(cmd::run::RunArgs),
    /// List registered datasets
    List(cmd::list::ListArgs),
    /// Check that raw and clean tables exist in the store
    Verify(cmd::verify::VerifyArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let progress = Arc::new(martline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug: spinners show activity
    //   non-TTY: info unless --debug: logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    martline_core::init_logging(quiet, cli.debug, multi);

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    martline_core::set_http_config(config.http.http_config(cli.read_timeout));

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::List(args) => cmd::list::run(args, &config),
        Command::Verify(args) => cmd::verify::run(args, &config),
        Command::Config => {
            cmd::print_config(&config, cli.read_timeout);
            Ok(ExitCode::SUCCESS)
        }
    }
}
