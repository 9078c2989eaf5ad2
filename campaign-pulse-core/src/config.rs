//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/campaign-pulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/campaign-pulse/` (~/.config/campaign-pulse/)
//! - State/Logs: `$XDG_STATE_HOME/campaign-pulse/` (~/.local/state/campaign-pulse/)
//!
//! The API base URL can also come from the `CAMPAIGN_PULSE_API_BASE_URL`
//! environment variable, which wins over the config file.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `[api].base_url`.
pub const BASE_URL_ENV: &str = "CAMPAIGN_PULSE_API_BASE_URL";

/// Base URL used when neither the environment nor the config file supplies one.
pub const DEFAULT_BASE_URL: &str = "https://mixo-fe-backend-task.vercel.app";

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

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Campaign API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Real-time stream configuration
    #[serde(default)]
    pub stream: StreamConfig,

    /// History window sizes
    #[serde(default)]
    pub history: HistoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Campaign API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// API base URL (e.g., `https://campaigns.example.com`)
    pub base_url: Option<String>,

    /// HTTP request timeout in seconds (not applied to the event stream body)
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_api_timeout(),
        }
    }
}

impl ApiConfig {
    /// The effective base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_timeout() -> u64 {
    30
}

/// Real-time stream configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// Start streaming automatically when a campaign is opened
    #[serde(default = "default_stream_enabled")]
    pub enabled: bool,

    /// Fixed delay between a lost connection and the next attempt
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Revenue attributed to each conversion when deriving ROI
    #[serde(default = "default_revenue_per_conversion")]
    pub revenue_per_conversion: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: default_stream_enabled(),
            reconnect_delay_secs: default_reconnect_delay(),
            revenue_per_conversion: default_revenue_per_conversion(),
        }
    }
}

impl StreamConfig {
    /// Reconnect delay as a [`Duration`]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

fn default_stream_enabled() -> bool {
    true
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_revenue_per_conversion() -> f64 {
    100.0
}

/// History buffer capacities for the campaign detail view
#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    /// Points kept for the trend charts
    #[serde(default = "default_short_window")]
    pub short_window: usize,

    /// Points kept for the long-range view
    #[serde(default = "default_long_window")]
    pub long_window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            short_window: default_short_window(),
            long_window: default_long_window(),
        }
    }
}

fn default_short_window() -> usize {
    30
}

fn default_long_window() -> usize {
    90
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
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
    /// Load configuration from the default path, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Apply overrides read through `lookup` (normally `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            tracing::debug!(base_url = %url, "Using API base URL from environment");
            self.api.base_url = Some(url);
        }
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.api.timeout_secs == 0 {
            return Err(Error::Config(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.stream.reconnect_delay_secs == 0 {
            return Err(Error::Config(
                "stream.reconnect_delay_secs must be greater than 0".to_string(),
            ));
        }
        let rpc = self.stream.revenue_per_conversion;
        if !rpc.is_finite() || rpc < 0.0 {
            return Err(Error::Config(
                "stream.revenue_per_conversion must be a non-negative number".to_string(),
            ));
        }
        if self.history.short_window == 0 || self.history.long_window == 0 {
            return Err(Error::Config(
                "history windows must hold at least one point".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/campaign-pulse/config.toml` (~/.config/campaign-pulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("campaign-pulse").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/campaign-pulse/` (~/.local/state/campaign-pulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("campaign-pulse")
    }

    /// Returns the log file path prefix
    ///
    /// `$XDG_STATE_HOME/campaign-pulse/campaign-pulse.log` (daily files get a date suffix)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("campaign-pulse.log")
    }
}
