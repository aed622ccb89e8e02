//! Error taxonomy for pipeline stages

use std::path::PathBuf;

use thiserror::Error;

use crate::table::ColumnType;

/// Failure raised by one pipeline component.
///
/// Every variant is fatal for the current dataset run; nothing here is
/// retried. The runner attaches the dataset name and stage (see
/// [`crate::runner::RunError`]).
#[derive(Debug, Error)]
pub enum EtlError {
    /// Source could not be opened or read (network, filesystem, malformed bytes).
    #[error("source unavailable: {uri}: {message}")]
    SourceUnavailable { uri: String, message: String },

    /// A source row had a different field count than the definition's columns.
    #[error("schema mismatch at row {row}: expected {expected} columns, found {found}")]
    SchemaMismatch {
        expected: usize,
        found: usize,
        row: usize,
    },

    /// A value could not be converted to its column's declared type.
    #[error("cannot coerce {value:?} to {expected} in column '{column}' (row {row})")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        expected: ColumnType,
    },

    /// A cleaning step referenced a column the dataset does not have.
    #[error("{step} step targets unknown column '{column}'")]
    UnknownColumn { column: String, step: &'static str },

    /// The file mirror could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connecting to, writing to, or querying the relational store failed.
    #[error("store unavailable while {action}: {message}")]
    StoreUnavailable { action: String, message: String },

    /// Registry lookup for a dataset name that is not registered.
    #[error("unknown dataset '{name}'")]
    UnknownDataset { name: String },

    /// Shutdown was requested before the next stage started.
    #[error("cancelled by shutdown request")]
    Cancelled,
}

impl EtlError {
    /// Build a `StoreUnavailable` from any store driver error.
    pub fn store(action: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable {
            action: action.into(),
            message: err.to_string(),
        }
    }

    /// Configuration errors come from a bad definition, not from the environment.
    /// Re-running without fixing the definition will fail the same way.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownColumn { .. } | Self::UnknownDataset { .. }
        )
    }

    /// Short taxonomy name for summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source-unavailable",
            Self::SchemaMismatch { .. } => "schema-mismatch",
            Self::TypeCoercion { .. } => "type-coercion",
            Self::UnknownColumn { .. } => "unknown-column",
            Self::Persistence { .. } => "persistence",
            Self::StoreUnavailable { .. } => "store-unavailable",
            Self::UnknownDataset { .. } => "unknown-dataset",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn display_schema_mismatch() {
        let err = EtlError::SchemaMismatch {
            expected: 7,
            found: 6,
            row: 0,
        };
        assert_eq!(
            err.to_string(),
            "schema mismatch at row 0: expected 7 columns, found 6"
        );
    }

    #[test]
    fn display_type_coercion_names_column_row_value() {
        let err = EtlError::TypeCoercion {
            column: "payment_installments".into(),
            row: 12,
            value: "two".into(),
            expected: ColumnType::Integer,
        };
        let msg = err.to_string();
        assert!(msg.contains("payment_installments"));
        assert!(msg.contains("row 12"));
        assert!(msg.contains("\"two\""));
        assert!(msg.contains("integer"));
    }

    #[test]
    fn persistence_keeps_io_source() {
        let err = EtlError::Persistence {
            path: PathBuf::from("/ro/orders_dataset.csv"),
            source: std::io::Error::new(ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/ro/orders_dataset.csv"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn store_helper() {
        let err = EtlError::store("listing tables", "connection closed");
        assert_eq!(
            err.to_string(),
            "store unavailable while listing tables: connection closed"
        );
        assert_eq!(err.kind(), "store-unavailable");
    }

    #[test]
    fn configuration_errors() {
        let unknown = EtlError::UnknownColumn {
            column: "x".into(),
            step: "title-case",
        };
        assert!(unknown.is_configuration());
        assert!(!EtlError::Cancelled.is_configuration());
    }
}
