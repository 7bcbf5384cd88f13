//! Querydaemon configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregator::BudgetPolicy;

/// Main querydaemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Response aggregation configuration
    pub response: ResponseConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .querydaemon.yml
        let local_config = PathBuf::from(".querydaemon.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/querydaemon/querydaemon.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("querydaemon").join("querydaemon.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// How long a query waits for responders before forcing resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedMode {
    /// Short budget for snappy interactions
    Quick,

    /// Standard budget
    #[default]
    Default,
}

/// Response aggregation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Active speed mode preset
    pub speed_mode: SpeedMode,

    /// Wait budget in seconds for quick mode
    #[serde(default = "default_quick_budget_secs")]
    pub quick_budget_secs: u64,

    /// Wait budget in seconds for default mode
    #[serde(default = "default_budget_secs")]
    pub default_budget_secs: u64,
}

fn default_quick_budget_secs() -> u64 {
    5
}

fn default_budget_secs() -> u64 {
    10
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            speed_mode: SpeedMode::Default,
            quick_budget_secs: default_quick_budget_secs(),
            default_budget_secs: default_budget_secs(),
        }
    }
}

impl ResponseConfig {
    /// The wait budget for the active speed mode
    pub fn budget(&self) -> Duration {
        match self.speed_mode {
            SpeedMode::Quick => Duration::from_secs(self.quick_budget_secs),
            SpeedMode::Default => Duration::from_secs(self.default_budget_secs),
        }
    }
}

impl BudgetPolicy for ResponseConfig {
    fn budget(&self) -> Duration {
        ResponseConfig::budget(self)
    }
}
