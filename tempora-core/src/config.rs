//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/tempora/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/tempora/` (~/.config/tempora/)
//! - Data: `$XDG_DATA_HOME/tempora/` (~/.local/share/tempora/)
//! - State/Logs: `$XDG_STATE_HOME/tempora/` (~/.local/state/tempora/)

use crate::analytics::{
    DEFAULT_DISTRIBUTION_DAYS, DEFAULT_PEAK_DAYS, DEFAULT_TREND_DAYS, MAX_TREND_DAYS,
    MAX_WINDOW_DAYS,
};
use crate::error::{Error, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::PathBuf;

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
    /// Analytics defaults
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default windows and the calendar timezone for aggregations
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Trailing days covered by the time distribution
    #[serde(default = "default_distribution_days")]
    pub distribution_days: u32,

    /// Number of calendar days in the productivity trend
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,

    /// Trailing days covered by the peak hours profile
    #[serde(default = "default_peak_days")]
    pub peak_days: u32,

    /// Offset used for calendar days and hour-of-day, e.g. "+02:00"
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            distribution_days: default_distribution_days(),
            trend_days: default_trend_days(),
            peak_days: default_peak_days(),
            utc_offset: default_utc_offset(),
        }
    }
}

fn default_distribution_days() -> u32 {
    DEFAULT_DISTRIBUTION_DAYS
}

fn default_trend_days() -> u32 {
    DEFAULT_TREND_DAYS
}

fn default_peak_days() -> u32 {
    DEFAULT_PEAK_DAYS
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

impl AnalyticsConfig {
    /// Parse the configured offset.
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset).ok_or_else(|| {
            Error::Config(format!(
                "analytics.utc_offset must look like +HH:MM, got {:?}",
                self.utc_offset
            ))
        })
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        self.offset()?;
        if self.trend_days > MAX_TREND_DAYS {
            return Err(Error::Config(format!(
                "analytics.trend_days must be at most {}",
                MAX_TREND_DAYS
            )));
        }
        for (key, days) in [
            ("distribution_days", self.distribution_days),
            ("peak_days", self.peak_days),
        ] {
            if days > MAX_WINDOW_DAYS {
                return Err(Error::Config(format!(
                    "analytics.{} must be at most {}",
                    key, MAX_WINDOW_DAYS
                )));
            }
        }
        Ok(())
    }
}

/// Parse `Z`, `UTC`, `+HH:MM`, `-HH:MM` or `+HHMM` into a fixed offset.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
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
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.analytics.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/tempora/config.toml` (~/.config/tempora/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("tempora").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("tempora")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("tempora")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/tempora/events.db` (~/.local/share/tempora/events.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("events.db")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("tempora.log")
    }
}
