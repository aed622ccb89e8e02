//! martline-store: DuckDB-backed relational store
//!
//! Each pipeline run gets its own connection, cloned from one root
//! connection so all runs share a single database instance.

mod config;
mod sql;

pub use config::StoreConfig;

use std::sync::Mutex;

use anyhow::{Context, Result};
use duckdb::types::{TimeUnit, Value};
use duckdb::{Connection, appender_params_from_iter};
use martline_core::{
    Cell, ConnectionFactory, EtlError, RelationalStore, TabularDataset, WriteOptions,
};

/// Hands out connections to one DuckDB database.
pub struct DuckDbFactory {
    root: Mutex<Connection>,
    config: StoreConfig,
}

impl DuckDbFactory {
    /// Open (or create) the database described by `config`.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let conn = match &config.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create store directory: {}", parent.display())
                    })?;
                }
                Connection::open(path)
                    .with_context(|| format!("Failed to open DuckDB at {}", path.display()))?
            }
            None => Connection::open_in_memory()
                .context("Failed to open DuckDB in-memory connection")?,
        };

        let mut settings = String::new();
        if let Some(limit) = &config.memory_limit {
            settings.push_str(&format!("SET memory_limit = '{}';", limit.replace('\'', "''")));
        }
        if let Some(threads) = config.threads {
            settings.push_str(&format!("SET threads = {threads};"));
        }
        if !settings.is_empty() {
            conn.execute_batch(&settings)
                .context("Failed to configure DuckDB")?;
        }

        log::debug!("Opened DuckDB store at {}", config.location());
        Ok(Self {
            root: Mutex::new(conn),
            config,
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(StoreConfig::in_memory())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Raw connection for ad hoc queries (row counts, inspection).
    pub fn connection(&self) -> Result<Connection, EtlError> {
        let root = self
            .root
            .lock()
            .map_err(|_| EtlError::store("connecting", "root connection lock poisoned"))?;
        root.try_clone()
            .map_err(|e| EtlError::store("connecting", e))
    }
}

impl ConnectionFactory for DuckDbFactory {
    fn connect(&self) -> Result<Box<dyn RelationalStore>, EtlError> {
        Ok(Box::new(DuckDbStore {
            conn: self.connection()?,
        }))
    }
}

/// One open DuckDB connection.
pub struct DuckDbStore {
    conn: Connection,
}

impl DuckDbStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Row count of `table`.
    pub fn row_count(&self, table: &str) -> Result<u64, EtlError> {
        let query = format!("SELECT count(*) FROM {}", sql::quote_ident(table));
        self.conn
            .query_row(&query, [], |row| row.get::<_, i64>(0))
            .map(|n| n.max(0) as u64)
            .map_err(|e| EtlError::store(format!("counting rows of {table}"), e))
    }
}

impl RelationalStore for DuckDbStore {
    fn replace_table(
        &mut self,
        table: &str,
        dataset: &TabularDataset,
        options: WriteOptions,
    ) -> Result<(), EtlError> {
        write_table(&mut self.conn, table, dataset, options)
            .map_err(|e| EtlError::store(format!("replacing table {table}"), e))?;
        log::debug!("Replaced {table} with {} rows", dataset.num_rows());
        Ok(())
    }

    fn table_names(&self) -> Result<Vec<String>, EtlError> {
        let list = || -> duckdb::Result<Vec<String>> {
            let mut stmt = self.conn.prepare(sql::list_tables())?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect()
        };
        list().map_err(|e| EtlError::store("listing tables", e))
    }

    fn close(self: Box<Self>) -> Result<(), EtlError> {
        self.conn
            .close()
            .map_err(|(_, e)| EtlError::store("closing connection", e))
    }
}

/// Drop, recreate and bulk-append in one transaction.
fn write_table(
    conn: &mut Connection,
    table: &str,
    dataset: &TabularDataset,
    options: WriteOptions,
) -> duckdb::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(&sql::drop_table(table))?;
    tx.execute_batch(&sql::create_table(table, dataset, options.include_index))?;
    {
        let mut appender = tx.appender(table)?;
        let mut row: Vec<Value> = Vec::with_capacity(dataset.num_columns() + 1);
        for (row_id, cells) in dataset.row_ids().iter().zip(dataset.rows()) {
            if options.include_index {
                row.push(Value::BigInt(*row_id as i64));
            }
            row.extend(cells.into_iter().map(to_value));
            appender.append_row(appender_params_from_iter(row.drain(..)))?;
        }
        appender.flush()?;
    }
    tx.commit()
}

fn to_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Str(s) => Value::Text(s.clone()),
        Cell::Int(n) => Value::BigInt(*n),
        Cell::Float(f) => Value::Double(*f),
        Cell::Timestamp(ts) => {
            Value::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use martline_core::{Column, ColumnType};

    fn payments() -> TabularDataset {
        TabularDataset::new(vec![
            Column::new(
                "order_id",
                ColumnType::String,
                vec!["a".into(), "b".into(), Cell::Null],
            ),
            Column::new(
                "payment_value",
                ColumnType::Float,
                vec![Cell::Float(10.5), Cell::Float(99.9), Cell::Float(1.0)],
            ),
        ])
    }

    #[test]
    fn replace_and_list() {
        let factory = DuckDbFactory::in_memory().unwrap();
        let mut store = factory.connect().unwrap();
        store
            .replace_table("raw_order_payment", &payments(), WriteOptions::default())
            .unwrap();
        assert_eq!(store.table_names().unwrap(), vec!["raw_order_payment"]);
        store.close().unwrap();
    }

    #[test]
    fn replace_does_not_accumulate() {
        let factory = DuckDbFactory::in_memory().unwrap();
        let mut store = DuckDbStore::new(factory.connection().unwrap());
        for _ in 0..3 {
            store
                .replace_table("clean_order_payment", &payments(), WriteOptions::default())
                .unwrap();
        }
        assert_eq!(store.row_count("clean_order_payment").unwrap(), 3);
    }

    #[test]
    fn index_column_holds_row_ids() {
        let factory = DuckDbFactory::in_memory().unwrap();
        let mut ds = payments();
        ds.retain_rows(&[false, true, true]);
        let mut store = DuckDbStore::new(factory.connection().unwrap());
        store
            .replace_table("clean_order_payment", &ds, WriteOptions::default())
            .unwrap();

        let conn = factory.connection().unwrap();
        let mut stmt = conn
            .prepare("SELECT \"index\", order_id FROM clean_order_payment ORDER BY 1")
            .unwrap();
        let rows: Vec<(i64, Option<String>)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<duckdb::Result<_>>()
            .unwrap();
        assert_eq!(rows, vec![(1, Some("b".to_string())), (2, None)]);
    }

    #[test]
    fn timestamps_round_trip_to_store() {
        let ts = chrono::NaiveDate::from_ymd_opt(2017, 10, 2)
            .unwrap()
            .and_hms_opt(10, 56, 33)
            .unwrap();
        let ds = TabularDataset::new(vec![Column::new(
            "order_purchase_timestamp",
            ColumnType::Timestamp,
            vec![Cell::Timestamp(ts)],
        )]);
        let factory = DuckDbFactory::in_memory().unwrap();
        let mut store = DuckDbStore::new(factory.connection().unwrap());
        store
            .replace_table("raw_orders", &ds, WriteOptions { include_index: false })
            .unwrap();
        let text: String = factory
            .connection()
            .unwrap()
            .query_row(
                "SELECT CAST(order_purchase_timestamp AS VARCHAR) FROM raw_orders",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(text, "2017-10-02 10:56:33");
    }

    #[test]
    fn missing_table_row_count_is_store_error() {
        let factory = DuckDbFactory::in_memory().unwrap();
        let store = DuckDbStore::new(factory.connection().unwrap());
        let err = store.row_count("raw_nothing").unwrap_err();
        assert!(matches!(err, EtlError::StoreUnavailable { .. }));
    }
}
