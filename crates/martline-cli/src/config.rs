//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use martline_core::{DatasetDefinition, HttpConfig};
use martline_datasets::{DEFAULT_BASE_URL, Registry};
use martline_store::StoreConfig;

/// Global configuration for martline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub store: StoreSection,
    pub workers: WorkersConfig,
    pub http: HttpSection,
    /// Extra or overriding dataset definitions
    pub datasets: Vec<DatasetDefinition>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory or URL holding the built-in source files
    #[serde(deserialize_with = "deserialize_env_var")]
    pub base_url: Option<String>,
}

impl SourceConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the clean file mirror
    pub clean_dir: PathBuf,
    /// Write the source row index as a leading column
    pub include_index: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            clean_dir: PathBuf::from("./data/clean"),
            include_index: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// DuckDB database file, or ":memory:"
    #[serde(deserialize_with = "deserialize_env_var")]
    pub path: Option<String>,
    /// DuckDB memory limit (e.g. "4GB")
    pub memory_limit: Option<String>,
    pub threads: Option<usize>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: Some("./data/martline.duckdb".to_string()),
            memory_limit: None,
            threads: None,
        }
    }
}

impl StoreSection {
    /// Store settings, with an optional path override from the command line.
    pub fn store_config(&self, path_override: Option<&Path>) -> StoreConfig {
        let path = match path_override {
            Some(p) => Some(p.to_path_buf()),
            None => match self.path.as_deref() {
                None | Some(":memory:") => None,
                Some(p) => Some(PathBuf::from(p)),
            },
        };
        StoreConfig {
            path,
            memory_limit: self.memory_limit.clone(),
            threads: self.threads,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
    pub max: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            default: cpus.min(4),
            max: 9,
        }
    }
}

impl WorkersConfig {
    /// Requested worker count bounded to `1..=max`.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default).clamp(1, self.max.max(1))
    }
}

/// HTTP timeouts in seconds
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub connect_timeout: u64,
    pub read_timeout: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            connect_timeout: 30,
            read_timeout: 30,
        }
    }
}

impl HttpSection {
    pub fn http_config(&self, read_timeout: Option<u64>) -> HttpConfig {
        HttpConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(read_timeout.unwrap_or(self.read_timeout)),
        }
    }
}

/// Deserialize a string that may be an environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to the variable's value; unset variables expand to nothing
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./martline.toml (current directory)
    /// 2. ~/.config/martline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("martline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "martline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Built-in datasets plus `[[datasets]]` entries (which win on name clashes).
    pub fn registry(&self) -> Registry {
        let mut registry = Registry::builtin(self.source.base_url());
        registry.extend(self.datasets.iter().cloned());
        registry
    }
}
