//! Configuration system for the kanban client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/kanban/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use crate::board::{BoardConfig, RetryPolicy};
use crate::store::memory::FaultPolicy;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Which [`TaskStore`](crate::store::TaskStore) backs the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process mock with simulated latency and failures.
    #[default]
    Memory,
    /// Remote `kanban-server` over HTTP.
    Http,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    store: StoreFileConfig,
    faults: FaultsFileConfig,
    board: BoardFileConfig,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    backend: Option<StoreBackend>,
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    seed: Option<bool>,
}

/// `[faults]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct FaultsFileConfig {
    read_failure_rate: Option<f64>,
    write_failure_rate: Option<f64>,
    list_latency_ms: Option<u64>,
    create_latency_ms: Option<u64>,
    update_latency_ms: Option<u64>,
    delete_latency_ms: Option<u64>,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    undo_window_ms: Option<u64>,
    load_retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    // -- Store --
    /// Store backend.
    pub backend: StoreBackend,
    /// Base URL of the `kanban-server` (HTTP backend only).
    pub server_url: String,
    /// Per-request timeout (HTTP backend only).
    pub request_timeout: Duration,
    /// Start the memory backend with the demo tasks.
    pub seed: bool,

    // -- Faults (memory backend only) --
    /// Latency and failure injection.
    pub faults: FaultPolicy,

    // -- Board --
    /// Undo window and load retry policy.
    pub board: BoardConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            server_url: "http://127.0.0.1:3001".to_string(),
            request_timeout: Duration::from_secs(10),
            seed: true,
            faults: FaultPolicy::default(),
            board: BoardConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or if the default file exists but is malformed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();
        let fault_defaults = defaults.faults;
        let ms = Duration::from_millis;

        Self {
            backend: cli
                .backend
                .or(file.store.backend)
                .unwrap_or(defaults.backend),
            server_url: cli
                .server_url
                .clone()
                .or_else(|| file.store.server_url.clone())
                .unwrap_or(defaults.server_url),
            request_timeout: file
                .store
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            seed: if cli.empty {
                false
            } else {
                file.store.seed.unwrap_or(defaults.seed)
            },
            faults: FaultPolicy {
                read_failure_rate: cli
                    .read_failure_rate
                    .or(file.faults.read_failure_rate)
                    .unwrap_or(fault_defaults.read_failure_rate),
                write_failure_rate: cli
                    .write_failure_rate
                    .or(file.faults.write_failure_rate)
                    .unwrap_or(fault_defaults.write_failure_rate),
                list_latency: file
                    .faults
                    .list_latency_ms
                    .map_or(fault_defaults.list_latency, ms),
                create_latency: file
                    .faults
                    .create_latency_ms
                    .map_or(fault_defaults.create_latency, ms),
                update_latency: file
                    .faults
                    .update_latency_ms
                    .map_or(fault_defaults.update_latency, ms),
                delete_latency: file
                    .faults
                    .delete_latency_ms
                    .map_or(fault_defaults.delete_latency, ms),
            },
            board: BoardConfig {
                undo_window: file
                    .board
                    .undo_window_ms
                    .map_or(defaults.board.undo_window, ms),
                load_retry: RetryPolicy {
                    max_retries: file
                        .board
                        .load_retries
                        .unwrap_or(defaults.board.load_retry.max_retries),
                    base_delay: file
                        .board
                        .retry_base_delay_ms
                        .map_or(defaults.board.load_retry.base_delay, ms),
                },
            },
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Kanban task board shell")]
pub struct CliArgs {
    /// Store backend.
    #[arg(long, value_enum, env = "KANBAN_BACKEND")]
    pub backend: Option<StoreBackend>,

    /// Base URL of the kanban server (http backend).
    #[arg(long, env = "KANBAN_SERVER_URL")]
    pub server_url: Option<String>,

    /// Probability that a read fails (memory backend).
    #[arg(long)]
    pub read_failure_rate: Option<f64>,

    /// Probability that a write fails (memory backend).
    #[arg(long)]
    pub write_failure_rate: Option<f64>,

    /// Start the memory backend without demo tasks.
    #[arg(long)]
    pub empty: bool,

    /// Path to config file (default: `~/.config/kanban/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "KANBAN_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/kanban.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("kanban").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
