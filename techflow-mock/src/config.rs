//! Mock server settings.
//!
//! Each setting is taken from the first source that has it: flags, then
//! `TECHFLOW_MOCK_*` variables, then `~/.config/techflow-mock/config.toml`,
//! then built-in defaults.

use std::path::PathBuf;

use crate::store::DEFAULT_PAGE_SIZE;

/// Errors that can occur when loading mock server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    ReadFile {
        /// File that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for this server.
    #[error("invalid mock config: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Settings file
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure for the mock server.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct MockConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    default_page_size: Option<u32>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the mock server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "In-memory TechFlow REST API")]
pub struct MockCliArgs {
    /// Address to bind the server to.
    #[arg(short, long, env = "TECHFLOW_MOCK_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/techflow-mock/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Page size for list requests without a `limit`.
    #[arg(long)]
    pub default_page_size: Option<u32>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TECHFLOW_MOCK_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved mock server configuration.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Address to bind the server to (e.g., `127.0.0.1:8080`).
    pub bind_addr: String,
    /// Page size for list requests without a `limit`.
    pub default_page_size: u32,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl MockConfig {
    /// Reads the settings file and layers `cli` over it.
    ///
    /// A missing default file is fine; a missing `--config` file is not.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a settings file cannot be read or parsed.
    pub fn load(cli: &MockCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default. A zero page size falls back to the
    /// default.
    fn resolve(cli: &MockCliArgs, file: &MockConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            default_page_size: cli
                .default_page_size
                .or(file.server.default_page_size)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.default_page_size),
            log_level: cli.log_level.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("techflow-mock").join("config.toml"))
}

fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<MockConfigFile, ConfigError> {
    let (path, required) = match explicit_path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(MockConfigFile::default()),
        },
    };
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            Ok(MockConfigFile::default())
        }
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}
