//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/studytrack/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/studytrack/` (~/.config/studytrack/)
//! - Data: `$XDG_DATA_HOME/studytrack/` (~/.local/share/studytrack/)
//! - State/Logs: `$XDG_STATE_HOME/studytrack/` (~/.local/state/studytrack/)

use crate::analytics::productivity::{ScoringWeights, MAX_WINDOW_DAYS};
use crate::error::{Error, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

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
    /// Streak tracking configuration
    #[serde(default)]
    pub streak: StreakConfig,

    /// Productivity score weights
    #[serde(default)]
    pub scoring: ScoringWeights,

    /// Statistics window configuration
    #[serde(default)]
    pub stats: StatsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where one calendar day ends and the next begins
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    #[default]
    Utc,
    Local,
}

impl DayBoundary {
    /// Calendar date of `now` on this boundary.
    pub fn calendar_day(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            DayBoundary::Utc => now.date_naive(),
            DayBoundary::Local => now.with_timezone(&Local).date_naive(),
        }
    }
}

/// Streak tracking configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StreakConfig {
    /// Timezone used to turn timestamps into calendar days
    #[serde(default)]
    pub day_boundary: DayBoundary,

    /// Whether a login counts as qualifying activity
    #[serde(default = "default_count_logins")]
    pub count_logins: bool,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            day_boundary: DayBoundary::default(),
            count_logins: default_count_logins(),
        }
    }
}

fn default_count_logins() -> bool {
    true
}

/// Statistics window configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    /// How many days of history feed the statistics and score
    #[serde(default = "default_window_days")]
    pub window_days: i64,

    /// Days shown in the daily activity strip
    #[serde(default = "default_heatmap_days")]
    pub heatmap_days: usize,

    /// Number of subjects listed in rankings
    #[serde(default = "default_top_subjects")]
    pub top_subjects: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            heatmap_days: default_heatmap_days(),
            top_subjects: default_top_subjects(),
        }
    }
}

fn default_window_days() -> i64 {
    30
}

fn default_heatmap_days() -> usize {
    7
}

fn default_top_subjects() -> usize {
    5
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

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        if !(1..=MAX_WINDOW_DAYS).contains(&self.stats.window_days) {
            return Err(Error::Config(format!(
                "stats.window_days must be between 1 and {}",
                MAX_WINDOW_DAYS
            )));
        }
        if self.stats.heatmap_days as i64 > MAX_WINDOW_DAYS {
            return Err(Error::Config(format!(
                "stats.heatmap_days must be at most {}",
                MAX_WINDOW_DAYS
            )));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/studytrack/config.toml` (~/.config/studytrack/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("studytrack").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("studytrack")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("studytrack")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/studytrack/data.db` (~/.local/share/studytrack/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }
}
