//! Relational store capability consumed by the loader and runner.
//!
//! The core never speaks a database dialect; concrete stores live in
//! their own crates (see `martline-store`).

use crate::error::EtlError;
use crate::table::{TabularDataset, WriteOptions};

/// An open connection to a relational store.
pub trait RelationalStore: Send {
    /// Replace `table` with the contents of `dataset` (drop and recreate).
    ///
    /// One call is one atomic bulk write as seen by the caller.
    fn replace_table(
        &mut self,
        table: &str,
        dataset: &TabularDataset,
        options: WriteOptions,
    ) -> Result<(), EtlError>;

    /// Names of all tables in the store's catalog.
    fn table_names(&self) -> Result<Vec<String>, EtlError>;

    /// Release the connection.
    fn close(self: Box<Self>) -> Result<(), EtlError>;
}

/// Opens store connections; one connection per pipeline run.
pub trait ConnectionFactory: Send + Sync {
    fn connect(&self) -> Result<Box<dyn RelationalStore>, EtlError>;
}
