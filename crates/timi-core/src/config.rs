//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/timi/config.toml)
//! 3. Environment variables (TIMI_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::INDEX_FILE_NAME;

/// Environment variable prefix
const ENV_PREFIX: &str = "TIMI";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (shards, index, undo journal)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log filter directive (e.g. "warn", "debug", "timi_core=trace")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Round stopped sessions to this many minutes (0 = no rounding)
    #[serde(default)]
    pub round_session_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_data_dir(default_data_dir())
    }
}

impl Config {
    /// Configuration rooted at `data_dir`, ignoring files and environment
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            log_level: None,
            round_session_minutes: 0,
        }
    }

    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TIMI_DATA_DIR, TIMI_LOG)
    /// 2. Config file (~/.config/timi/config.toml or TIMI_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // TIMI_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            if !val.is_empty() {
                self.data_dir = PathBuf::from(val);
            }
        }

        // TIMI_LOG
        if let Ok(val) = std::env::var(format!("{}_LOG", ENV_PREFIX)) {
            self.log_level = if val.is_empty() { None } else { Some(val) };
        }
    }

    /// Set a single setting from its textual value
    ///
    /// Keys: `data_dir`, `log_level` (empty or "none" clears it) and
    /// `round_session_minutes`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => {
                if value.is_empty() {
                    bail!("data_dir must not be empty");
                }
                self.data_dir = PathBuf::from(value);
            }
            "log_level" => {
                self.log_level = if value.is_empty() || value == "none" {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "round_session_minutes" => {
                self.round_session_minutes = value.trim().parse().with_context(|| {
                    format!(
                        "Invalid value for round_session_minutes: '{}'. Use a whole number of minutes.",
                        value
                    )
                })?;
            }
            _ => {
                bail!(
                    "Unknown configuration key: '{}'\n\
                     Valid keys: data_dir, log_level, round_session_minutes",
                    key
                );
            }
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to `config_path`
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TIMI_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("timi")
            .join("config.toml")
    }

    /// Directory holding the month shards and the index
    pub fn entries_dir(&self) -> PathBuf {
        self.data_dir.join("entries")
    }

    /// Path of the ID index
    pub fn index_path(&self) -> PathBuf {
        self.entries_dir().join(INDEX_FILE_NAME)
    }

    /// Path of the undo journal
    pub fn undo_path(&self) -> PathBuf {
        self.data_dir.join("history").join("last-action.json")
    }

    /// Path of the running-session file
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".timi")
}
