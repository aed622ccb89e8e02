//! Loader: replace-load into the relational store, then report existence

use crate::error::EtlError;
use crate::store::RelationalStore;
use crate::table::{TabularDataset, WriteOptions};

/// Replace `table_name` with `dataset`, then check the catalog for it.
///
/// Write failures are fatal; the returned flag is the (non-fatal)
/// verification result.
pub fn load(
    dataset: &TabularDataset,
    table_name: &str,
    store: &mut dyn RelationalStore,
    options: WriteOptions,
) -> Result<bool, EtlError> {
    log::info!(
        "Loading {} rows to table: {table_name}",
        dataset.num_rows()
    );
    store.replace_table(table_name, dataset, options)?;
    Ok(verify_table_exists(table_name, store))
}

/// Report whether `table_name` is in the store's catalog. Never fails:
/// a missing table or an unreadable catalog is logged as a warning.
pub fn verify_table_exists(table_name: &str, store: &dyn RelationalStore) -> bool {
    match store.table_names() {
        Ok(names) if names.iter().any(|n| n == table_name) => {
            log::info!("{table_name:?} exists in store");
            true
        }
        Ok(_) => {
            log::warn!("{table_name:?} does not exist in store");
            false
        }
        Err(e) => {
            log::warn!("Could not verify {table_name:?}: {e}");
            false
        }
    }
}
