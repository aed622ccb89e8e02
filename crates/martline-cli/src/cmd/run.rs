//! Run subcommand - execute dataset pipelines in parallel

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Args;
use comfy_table::{Cell, Color};
use rayon::prelude::*;

use martline_core::{
    DatasetDefinition, FanOut, LogObserver, PipelineOptions, PipelineRunner, ProgressObserver,
    RunError, RunReport, SharedProgress, StageObserver, WriteOptions, fmt_num,
};
use martline_store::DuckDbFactory;

use super::styled_table;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Datasets to run (see `martline list`)
    pub datasets: Vec<String>,

    /// Run every registered dataset
    #[arg(long, conflicts_with = "datasets")]
    pub all: bool,

    /// Number of datasets processed in parallel
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Clean mirror directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// DuckDB database file
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Do not write the source row index column
    #[arg(long)]
    pub no_index: bool,
}

struct Outcome<'a> {
    definition: &'a DatasetDefinition,
    result: Result<RunReport, RunError>,
    elapsed: Duration,
}

pub fn run(args: RunArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let registry = config.registry();
    let definitions: Vec<&DatasetDefinition> = if args.all {
        registry.iter().collect()
    } else if args.datasets.is_empty() {
        bail!("No datasets given; name some or pass --all (see `martline list`)");
    } else {
        registry.resolve(&args.datasets)?
    };

    let options = PipelineOptions {
        clean_dir: args
            .output
            .unwrap_or_else(|| config.output.clean_dir.clone()),
        write: WriteOptions {
            include_index: config.output.include_index && !args.no_index,
        },
    };
    let workers = config.workers.resolve(args.workers).min(definitions.len());

    let store_config = config.store.store_config(args.store.as_deref());
    let factory = DuckDbFactory::open(store_config)?;

    martline_core::install_signal_handlers().context("Failed to install signal handlers")?;

    log::info!(
        "Running {} dataset(s) with {workers} worker(s) into {}",
        definitions.len(),
        factory.config().location()
    );

    let progress_observer = ProgressObserver::new(progress.clone());
    for def in &definitions {
        progress_observer.register(def.name());
    }
    let observers: Vec<&dyn StageObserver> = vec![&LogObserver, &progress_observer];
    let observer = FanOut(observers);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")?;

    let outcomes: Vec<Outcome> = pool.install(|| {
        definitions
            .par_iter()
            .map(|&def| {
                let started = Instant::now();
                let result = PipelineRunner::new(def, &options)
                    .with_observer(&observer)
                    .with_cancel_flag(martline_core::shutdown_flag())
                    .run(&factory);
                let elapsed = started.elapsed();
                if let Ok(report) = &result {
                    progress_observer.finish(
                        def.name(),
                        format!("done: {} clean rows", fmt_num(report.clean_rows)),
                    );
                }
                Outcome {
                    definition: def,
                    result,
                    elapsed,
                }
            })
            .collect()
    });

    print_summary(&outcomes);

    let failed: Vec<&RunError> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err())
        .collect();
    for err in &failed {
        log::error!("{err}");
    }

    if martline_core::is_shutdown_requested() {
        log::warn!("Interrupted; re-run to complete the remaining datasets");
        return Ok(ExitCode::from(130));
    }
    if failed.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        log::error!("{} of {} dataset(s) failed", failed.len(), outcomes.len());
        Ok(ExitCode::FAILURE)
    }
}

/// Print one row per dataset on stderr
fn print_summary(outcomes: &[Outcome]) {
    let mut table = styled_table(&[
        "Dataset",
        "State",
        "Raw rows",
        "Clean rows",
        "Tables",
        "Elapsed",
    ]);
    for outcome in outcomes {
        let name = outcome.definition.name();
        let elapsed = format!("{:.1}s", outcome.elapsed.as_secs_f64());
        match &outcome.result {
            Ok(report) => {
                let tables = if report.verified() {
                    Cell::new("ok").fg(Color::Green)
                } else {
                    Cell::new("missing").fg(Color::Yellow)
                };
                table.add_row(vec![
                    Cell::new(name),
                    Cell::new("done").fg(Color::Green),
                    Cell::new(fmt_num(report.raw_rows)),
                    Cell::new(fmt_num(report.clean_rows)),
                    tables,
                    Cell::new(elapsed),
                ]);
            }
            Err(err) => {
                table.add_row(vec![
                    Cell::new(name),
                    Cell::new(format!("failed ({})", err.stage)).fg(Color::Red),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(err.source.kind()).fg(Color::Red),
                    Cell::new(elapsed),
                ]);
            }
        }
    }
    eprintln!("\n{table}");
}
