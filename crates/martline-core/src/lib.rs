//! Martline Core - generic extract/clean/persist/load engine
//!
//! Every dataset runs through the same linear pipeline; what varies is the
//! [`DatasetDefinition`]: its column schema and ordered cleaning steps.

pub mod clean;
pub mod definition;
pub mod error;
pub mod extract;
pub mod load;
pub mod logging;
pub mod observer;
pub mod persist;
pub mod progress;
pub mod runner;
pub mod shutdown;
pub mod source;
pub mod store;
pub mod table;

// Re-exports for convenience
pub use clean::clean;
pub use definition::{CleaningStep, DatasetDefinition, TableIdentity};
pub use error::EtlError;
pub use extract::{extract, extract_from_reader};
pub use load::{load, verify_table_exists};
pub use logging::{IndicatifLogger, init_logging};
pub use observer::{FanOut, LogObserver, StageObserver};
pub use persist::{mirror_path, persist};
pub use progress::{ProgressContext, ProgressObserver, SharedProgress, fmt_num};
pub use runner::{PipelineOptions, PipelineRunner, RunError, RunReport, RunState};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown, shutdown_flag};
pub use source::{HttpConfig, http_config, set_http_config};
pub use store::{ConnectionFactory, RelationalStore};
pub use table::{Cell, Column, ColumnType, TabularDataset, WriteOptions};
