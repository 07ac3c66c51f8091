//! Configuration management for the reviewer service
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (REVIEWER_*)
//! 3. Config file (~/.config/reviewer/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How identifiers for new teams, users and pull requests are obtained
///
/// A deployment picks one mode; the two are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdMode {
    /// The identifier generator is always used; callers must not supply ids
    #[default]
    Generated,
    /// Callers always supply ids, e.g. from an external system of record
    External,
}

impl FromStr for IdMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generated" => Ok(IdMode::Generated),
            "external" => Ok(IdMode::External),
            other => Err(Error::Config(format!("unknown id mode: {}", other))),
        }
    }
}

/// Database-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file
    pub path: PathBuf,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// How long a writer waits for a locked database before failing
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: Config::default_database_path(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Reviewer assignment configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssignmentSettings {
    /// Maximum number of reviewers assigned when a pull request is created
    pub max_reviewers: usize,

    /// Identifier scheme for new records
    pub id_mode: IdMode,
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        Self {
            max_reviewers: 2,
            id_mode: IdMode::Generated,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,

    pub assignment: AssignmentSettings,

    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            assignment: AssignmentSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database_path: Option<PathBuf>,
    pub id_mode: Option<IdMode>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/reviewer/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("reviewer").join("config.toml"))
    }

    /// Get the default database path
    ///
    /// Returns `~/.local/share/reviewer/reviewer.db` on Unix
    pub fn default_database_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reviewer")
            .join("reviewer.db")
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - REVIEWER_DATABASE_PATH: SQLite database file
    /// - REVIEWER_MAX_CONNECTIONS: connection pool size
    /// - REVIEWER_ID_MODE: `generated` or `external`
    /// - REVIEWER_LOG_LEVEL: default tracing filter
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = var("REVIEWER_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("REVIEWER_MAX_CONNECTIONS") {
            self.database.max_connections = max.parse().map_err(|e| {
                Error::Config(format!("Invalid REVIEWER_MAX_CONNECTIONS '{}': {}", max, e))
            })?;
        }

        if let Some(mode) = var("REVIEWER_ID_MODE") {
            self.assignment.id_mode = mode.parse()?;
        }

        if let Some(level) = var("REVIEWER_LOG_LEVEL") {
            self.log_level = level;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: CliOverrides) -> Self {
        if let Some(path) = overrides.database_path {
            self.database.path = path;
        }

        if let Some(mode) = overrides.id_mode {
            self.assignment.id_mode = mode;
        }

        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(config_file: Option<&Path>, cli: CliOverrides) -> Result<Self> {
        let base = match config_file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };
        Ok(base.with_env_overrides()?.with_cli_overrides(cli))
    }
}
