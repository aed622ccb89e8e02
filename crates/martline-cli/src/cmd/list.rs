//! List subcommand - show registered datasets

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use super::styled_table;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show declared column types and every cleaning step
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run(args: ListArgs, config: &Config) -> Result<ExitCode> {
    let registry = config.registry();

    if !args.verbose {
        let mut table = styled_table(&["Dataset", "Columns", "Steps", "Source"]);
        for def in registry.iter() {
            table.add_row(vec![
                def.name().to_string(),
                def.columns().len().to_string(),
                def.steps().len().to_string(),
                def.source_uri().to_string(),
            ]);
        }
        println!("{table}");
        return Ok(ExitCode::SUCCESS);
    }

    for def in registry.iter() {
        let tables = def.tables();
        println!("{} ({} / {})", def.name(), tables.raw, tables.clean);
        println!("  source: {}", def.source_uri());
        let columns: Vec<String> = def
            .columns()
            .iter()
            .map(|c| match def.declared_type(c) {
                Some(ty) => format!("{c}: {ty}"),
                None => c.clone(),
            })
            .collect();
        println!("  columns: {}", columns.join(", "));
        for (i, step) in def.steps().iter().enumerate() {
            println!("  {}. {step}", i + 1);
        }
    }
    Ok(ExitCode::SUCCESS)
}
