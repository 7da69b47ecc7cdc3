//! Configuration file support for DrugVision.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/drugvision/config.toml`.

use crate::{Error, Result, TimeOfDay};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub adherence: AdherenceConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Adherence reporting configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdherenceConfig {
    /// Summaries below this percentage are flagged
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,
}

impl Default for AdherenceConfig {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
        }
    }
}

/// Defaults applied when entering new plans
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_times")]
    pub default_times: Vec<TimeOfDay>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_times: default_times(),
        }
    }
}

fn home_subdir(sub: &str) -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(sub)
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| home_subdir(".local/share"))
        .join("drugvision")
}

fn default_low_threshold() -> f64 {
    80.0
}

fn default_times() -> Vec<TimeOfDay> {
    vec![TimeOfDay::Morning]
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| home_subdir(".config"))
            .join("drugvision")
            .join("config.toml")
    }

    /// Check values serde can't
    pub fn validate(&self) -> Result<()> {
        let threshold = self.adherence.low_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "adherence.low_threshold must be between 0 and 100, got {}",
                threshold
            )));
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
