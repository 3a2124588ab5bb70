//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/callscope/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/callscope/` (~/.config/callscope/)
//! - Data: `$XDG_DATA_HOME/callscope/` (~/.local/share/callscope/)
//! - State/Logs: `$XDG_STATE_HOME/callscope/` (~/.local/state/callscope/)

use crate::error::{Error, Result};
use crate::types::Granularity;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted when `source.api_key` is not set
pub const API_KEY_ENV: &str = "CALLSCOPE_API_KEY";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Where call records are read from
    #[serde(default)]
    pub source: SourceConfig,

    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Supported call data sources
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local SQLite store
    #[default]
    Sqlite,
    /// Hosted PostgREST backend
    Rest,
}

/// Data source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Which adapter to use
    #[serde(default)]
    pub kind: SourceKind,

    /// SQLite database path override (defaults to the XDG data dir)
    pub database_path: Option<PathBuf>,

    /// Base URL of the hosted backend (e.g., `https://xyz.supabase.co`)
    pub url: Option<String>,

    /// API key for the hosted backend (can also use env var)
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    /// Rows requested per page from the hosted backend
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            database_path: None,
            url: None,
            api_key: None,
            timeout_secs: default_source_timeout(),
            page_size: default_page_size(),
        }
    }
}

impl SourceConfig {
    /// API key from config, falling back to `CALLSCOPE_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
    }

    /// SQLite path from config, falling back to the XDG default.
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(Config::database_path)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.kind != SourceKind::Rest {
            return Ok(());
        }

        if self.url.is_none() {
            return Err(Error::Config(
                "source.url is required when source.kind = \"rest\"".to_string(),
            ));
        }
        if self.resolved_api_key().is_none() {
            return Err(Error::Config(format!(
                "source.api_key (or {}) is required when source.kind = \"rest\"",
                API_KEY_ENV
            )));
        }
        if self.page_size == 0 {
            return Err(Error::Config(
                "source.page_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_source_timeout() -> u64 {
    30
}

fn default_page_size() -> usize {
    1000
}

/// Analytics configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Number of trailing periods in the accuracy moving average
    #[serde(default = "default_moving_average_window")]
    pub moving_average_window: usize,

    /// Number of keywords kept in the keyword report
    #[serde(default = "default_top_keywords")]
    pub top_keywords: usize,

    /// Number of keywords kept in the trending list
    #[serde(default = "default_trending_keywords")]
    pub trending_keywords: usize,

    /// Date range used by the CLI when `--start` is omitted
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: i64,

    /// Trend granularity used when a request does not name one
    #[serde(default)]
    pub default_granularity: Granularity,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            moving_average_window: default_moving_average_window(),
            top_keywords: default_top_keywords(),
            trending_keywords: default_trending_keywords(),
            default_lookback_days: default_lookback_days(),
            default_granularity: Granularity::default(),
        }
    }
}

fn default_moving_average_window() -> usize {
    3
}

fn default_top_keywords() -> usize {
    20
}

fn default_trending_keywords() -> usize {
    10
}

fn default_lookback_days() -> i64 {
    30
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.source.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/callscope/config.toml` (~/.config/callscope/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("callscope").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite store)
    ///
    /// `$XDG_DATA_HOME/callscope/` (~/.local/share/callscope/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("callscope")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/callscope/` (~/.local/state/callscope/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("callscope")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/callscope/calls.db` (~/.local/share/callscope/calls.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("calls.db")
    }
}
