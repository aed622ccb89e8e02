use std::path::PathBuf;

/// Configuration for the DuckDB store.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Database file; `None` for an in-memory database
    pub path: Option<PathBuf>,
    /// DuckDB memory limit (e.g. "4GB")
    pub memory_limit: Option<String>,
    /// DuckDB worker threads; DuckDB's default when unset
    pub threads: Option<usize>,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Human-readable location for logs and the `config` command.
    pub fn location(&self) -> String {
        match &self.path {
            Some(p) => p.display().to_string(),
            None => ":memory:".to_string(),
        }
    }
}
