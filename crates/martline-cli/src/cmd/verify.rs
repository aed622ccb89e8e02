//! Verify subcommand - catalog check of raw and clean tables

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color};

use martline_core::{ConnectionFactory, DatasetDefinition, fmt_num, verify_table_exists};
use martline_store::{DuckDbFactory, DuckDbStore};

use super::styled_table;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Datasets to check (default: all registered)
    pub datasets: Vec<String>,

    /// DuckDB database file
    #[arg(long)]
    pub store: Option<PathBuf>,
}

pub fn run(args: VerifyArgs, config: &Config) -> Result<ExitCode> {
    let registry = config.registry();
    let definitions: Vec<&DatasetDefinition> = if args.datasets.is_empty() {
        registry.iter().collect()
    } else {
        registry.resolve(&args.datasets)?
    };

    let factory = DuckDbFactory::open(config.store.store_config(args.store.as_deref()))?;
    let catalog = factory.connect()?;
    let counter = DuckDbStore::new(factory.connection()?);

    let mut missing = 0usize;
    let mut table = styled_table(&["Dataset", "Raw table", "Clean table"]);
    for def in &definitions {
        let tables = def.tables();
        let mut row = vec![Cell::new(def.name())];
        for name in [&tables.raw, &tables.clean] {
            if verify_table_exists(name, &*catalog) {
                let rows = counter
                    .row_count(name)
                    .map(|n| fmt_num(n as usize))
                    .unwrap_or_else(|_| "?".to_string());
                row.push(Cell::new(format!("{name} ({rows} rows)")).fg(Color::Green));
            } else {
                missing += 1;
                row.push(Cell::new(format!("{name} missing")).fg(Color::Red));
            }
        }
        table.add_row(row);
    }
    eprintln!("\n{table}");

    catalog.close()?;

    if missing > 0 {
        log::warn!("{missing} table(s) missing from {}", factory.config().location());
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
