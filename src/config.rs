//! YAML configuration loading and validation.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Input sources feeding the run.
    #[serde(default)]
    pub input: InputConfig,

    /// Regions the collection layer attempted this run, independent of the
    /// regions the records themselves mention.
    #[serde(default)]
    pub collected_regions: Vec<String>,

    /// Persistence backend settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// NDJSON input sources.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputConfig {
    /// Files to read, in order; the entry `-` reads stdin.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// Store backend selection and destinations.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Which backend writes the dashboard items.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Destination tables; every table receives the same item batch.
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,

    /// HTTP backend settings.
    #[serde(default)]
    pub http: HttpStoreConfig,

    /// File backend settings.
    #[serde(default)]
    pub file: FileStoreConfig,
}

/// Available store backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Http,
    #[default]
    File,
}

impl StoreBackend {
    /// Returns the backend name for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::File => "file",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpStoreConfig {
    /// Base URL; items for table T are posted to `<endpoint>/<T>`.
    #[serde(default)]
    pub endpoint: String,

    /// Extra request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request body compression.
    #[serde(default = "default_compression")]
    pub compression: Compression,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Additional attempts after a retryable failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before retry N is `retry_backoff * N`.
    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,
}

/// Request body compression algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    /// Returns the algorithm name for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FileStoreConfig {
    /// Directory receiving one `<table>.ndjson` file per table.
    #[serde(default = "default_store_directory")]
    pub directory: PathBuf,
}

// --- Default value functions ---

fn default_tables() -> Vec<String> {
    vec!["inventory_metrics".to_string()]
}

fn default_compression() -> Compression {
    Compression::Gzip
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff() -> Duration {
    Duration::from_millis(500)
}

fn default_store_directory() -> PathBuf {
    PathBuf::from("metrics-out")
}

// --- Default trait impls ---

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            tables: default_tables(),
            http: HttpStoreConfig::default(),
            file: FileStoreConfig::default(),
        }
    }
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            headers: HashMap::new(),
            compression: default_compression(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            directory: default_store_directory(),
        }
    }
}

// --- Validation and loading ---

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.input.paths.is_empty() {
            bail!("input.paths must list at least one source");
        }

        if self.store.tables.is_empty() {
            bail!("store.tables must list at least one table");
        }

        for table in &self.store.tables {
            if table.is_empty() {
                bail!("store.tables entries must not be empty");
            }
        }

        match self.store.backend {
            StoreBackend::Http => {
                if self.store.http.endpoint.is_empty() {
                    bail!("store.http.endpoint is required for the http backend");
                }
                if self.store.http.request_timeout.is_zero() {
                    bail!("store.http.request_timeout must be positive");
                }
            }
            StoreBackend::File => {
                if self.store.file.directory.as_os_str().is_empty() {
                    bail!("store.file.directory is required for the file backend");
                }
            }
        }

        Ok(())
    }
}
