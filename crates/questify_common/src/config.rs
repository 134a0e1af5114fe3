//! Questify configuration.
//!
//! Config file: $QUESTIFY_CONFIG, ~/.config/questify/config.toml or
//! /etc/questify/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::task::DEFAULT_TASK_XP;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "QUESTIFY_CONFIG";

/// Storage configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file; defaults to the user data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the database path, falling back to the default location
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(default_db_path)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when QUESTIFY_LOG is unset (e.g. "info", "questify_common=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Task defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksConfig {
    /// XP a new task is worth unless given explicitly
    #[serde(default = "default_task_xp")]
    pub default_xp_value: u64,
}

fn default_task_xp() -> u64 {
    DEFAULT_TASK_XP
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_xp_value: DEFAULT_TASK_XP,
        }
    }
}

/// Main Questify configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestifyConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tasks: TasksConfig,
}

impl QuestifyConfig {
    /// Get default user config path: ~/.config/questify/config.toml
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("questify").join("config.toml"))
    }

    /// Get system config path: /etc/questify/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/questify/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. $QUESTIFY_CONFIG (must exist when set)
    /// 2. User config (~/.config/questify/config.toml)
    /// 3. System config (/etc/questify/config.toml)
    /// 4. Defaults
    pub fn load() -> Result<Self> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV) {
            return Self::load_from_path(Path::new(&explicit));
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from_path(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from_path(&system_path);
        }

        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save configuration to a file, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Default database path: <data dir>/questify/questify.db
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("questify")
        .join("questify.db")
}
