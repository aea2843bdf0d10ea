//! Configuration system for the `TechFlow` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/techflow/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Base URL of the hosted REST service.
pub const DEFAULT_BASE_URL: &str =
    "https://cs2031-2025-2-hackathon-2-backend-production.up.railway.app/v1";

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

    /// A value was present but out of range.
    #[error("invalid config value for {key}: {reason}")]
    InvalidValue {
        /// Dotted key, e.g. `board.page_size`.
        key: &'static str,
        /// What was wrong with it.
        reason: &'static str,
    },
}

/// How the task list is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Flat list of cards.
    #[default]
    Grid,
    /// One column per status.
    Kanban,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid => write!(f, "grid"),
            Self::Kanban => write!(f, "kanban"),
        }
    }
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    board: BoardFileConfig,
    ui: UiFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    poll_interval_secs: Option<u64>,
    page_size: Option<u32>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    view: Option<ViewMode>,
    due_soon_days: Option<i64>,
    recent_count: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    // -- API --
    /// Base URL of the REST service, including the version prefix.
    pub base_url: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,

    // -- Board --
    /// Interval between polling refreshes of the task board.
    pub poll_interval: Duration,
    /// Tasks fetched per board page.
    pub page_size: u32,

    // -- UI --
    /// Task list presentation.
    pub view: ViewMode,
    /// Tasks due within this many days are flagged as due soon.
    pub due_soon_days: i64,
    /// Number of recent tasks shown on the dashboard.
    pub recent_count: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
            poll_interval: Duration::from_secs(5),
            page_size: 20,
            view: ViewMode::Grid,
            due_soon_days: 3,
            recent_count: 5,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path (`~/.config/techflow/config.toml`)
    /// is tried and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or if a value is out of range.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` so it can be
    /// tested without CLI parsing.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let poll_interval_secs = cli.poll_interval_secs.or(file.board.poll_interval_secs);
        if poll_interval_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "board.poll_interval_secs",
                reason: "must be at least 1",
            });
        }
        let page_size = file.board.page_size.unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "board.page_size",
                reason: "must be at least 1",
            });
        }

        Ok(Self {
            base_url: cli
                .base_url
                .clone()
                .or_else(|| file.api.base_url.clone())
                .unwrap_or(defaults.base_url),
            request_timeout: file
                .api
                .request_timeout_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
            poll_interval: poll_interval_secs.map_or(defaults.poll_interval, Duration::from_secs),
            page_size,
            view: cli.view.or(file.ui.view).unwrap_or(defaults.view),
            due_soon_days: file.ui.due_soon_days.unwrap_or(defaults.due_soon_days),
            recent_count: file.ui.recent_count.unwrap_or(defaults.recent_count),
        })
    }
}

/// Global CLI arguments, shared by every subcommand.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct CliArgs {
    /// Base URL of the REST service.
    #[arg(long, global = true, env = "TECHFLOW_API_URL")]
    pub base_url: Option<String>,

    /// Bearer token from a previous `login`.
    #[arg(long, global = true, env = "TECHFLOW_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to config file (default: `~/.config/techflow/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Task list presentation.
    #[arg(long, global = true, value_enum)]
    pub view: Option<ViewMode>,

    /// Seconds between board refreshes in `watch`.
    #[arg(long, global = true)]
    pub poll_interval_secs: Option<u64>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "TECHFLOW_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/techflow.log`).
    #[arg(long, global = true)]
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
        config_dir.join("techflow").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
