//! Subcommands

pub mod list;
pub mod run;
pub mod verify;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

/// Table with the shared look and a cyan header row.
pub fn styled_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

/// Print the effective configuration on stderr
pub fn print_config(config: &Config, read_timeout: Option<u64>) {
    let mut table = styled_table(&["Setting", "Value"]);
    let store = config.store.store_config(None);
    let http = config.http.http_config(read_timeout);

    table.add_row(vec!["Source base URL", config.source.base_url()]);
    table.add_row(vec![
        "Clean directory",
        &config.output.clean_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Row index",
        if config.output.include_index {
            "written"
        } else {
            "omitted"
        },
    ]);
    table.add_row(vec!["Store", &store.location()]);
    table.add_row(vec![
        "Memory limit",
        store.memory_limit.as_deref().unwrap_or("duckdb default"),
    ]);
    table.add_row(vec![
        "Workers",
        &format!("{} (max: {})", config.workers.default, config.workers.max),
    ]);
    table.add_row(vec![
        "Connect timeout",
        &format!("{}s", http.connect_timeout.as_secs()),
    ]);
    table.add_row(vec![
        "Read timeout",
        &format!("{}s", http.read_timeout.as_secs()),
    ]);
    table.add_row(vec![
        "Datasets",
        &format!(
            "{} ({} from config)",
            config.registry().len(),
            config.datasets.len()
        ),
    ]);

    eprintln!("\n{table}");
}
