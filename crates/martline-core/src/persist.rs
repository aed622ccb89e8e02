//! Persister: CSV file mirror with atomic tmp→rename replace

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::EtlError;
use crate::table::{TabularDataset, WriteOptions};

/// Mirror file for a dataset: `<clean_dir>/<name>_dataset.csv`
pub fn mirror_path(clean_dir: &Path, dataset_name: &str) -> PathBuf {
    clean_dir.join(format!("{dataset_name}_dataset.csv"))
}

/// Write `dataset` to `destination`, fully replacing any existing file.
///
/// The header row holds the column names (preceded by an empty cell for
/// the index column when enabled); nulls are written as empty fields.
/// Output is written to `<destination>.tmp` first and renamed into place,
/// so readers never see a half-written mirror. Returns the row count.
pub fn persist(
    dataset: &TabularDataset,
    destination: &Path,
    options: WriteOptions,
) -> Result<usize, EtlError> {
    write_mirror(dataset, destination, options).map_err(|source| EtlError::Persistence {
        path: destination.to_path_buf(),
        source,
    })?;
    log::info!(
        "Saved {} rows to {}",
        dataset.num_rows(),
        destination.display()
    );
    Ok(dataset.num_rows())
}

fn write_mirror(
    dataset: &TabularDataset,
    destination: &Path,
    options: WriteOptions,
) -> io::Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = destination.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    // Clean up stale tmp file from an interrupted run
    if tmp_path.exists() {
        fs::remove_file(&tmp_path)?;
    }

    let mut writer = csv::Writer::from_path(&tmp_path).map_err(io::Error::other)?;

    let mut header: Vec<&str> = Vec::with_capacity(dataset.num_columns() + 1);
    if options.include_index {
        header.push("");
    }
    header.extend(dataset.column_names());
    writer.write_record(&header).map_err(io::Error::other)?;

    let mut fields: Vec<String> = Vec::with_capacity(dataset.num_columns() + 1);
    for (row_id, row) in dataset.row_ids().iter().zip(dataset.rows()) {
        fields.clear();
        if options.include_index {
            fields.push(row_id.to_string());
        }
        fields.extend(
            row.into_iter()
                .map(|cell| cell.render().map(|v| v.into_owned()).unwrap_or_default()),
        );
        writer.write_record(&fields).map_err(io::Error::other)?;
    }

    writer.flush()?;
    drop(writer);
    fs::rename(&tmp_path, destination)
}
