//! Configuration file handling for ~/.panotile/config.ini.
//!
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::settings::ConfigFile;
use crate::metrics::MetricsConfig;
use crate::scheduler::SchedulerConfig;
use crate::viewport::PredictorConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.panotile/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, self.to_ini_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Commented INI text as written by [`save_to`](Self::save_to).
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Runtime scheduler tunables.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            threshold: self.scheduler.threshold,
            hysteresis: self.scheduler.hysteresis,
            dwell: Duration::from_millis(self.scheduler.dwell_ms),
            use_prediction: self.scheduler.use_prediction,
            retry_cooldown: Duration::from_millis(self.scheduler.retry_cooldown_ms),
        }
    }

    /// Runtime predictor sizing.
    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            window: self.predictor.window,
            horizon: self.predictor.horizon,
        }
    }

    /// Runtime metrics polling configuration.
    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            interval: Duration::from_millis(self.metrics.interval_ms),
        }
    }
}

/// Get the path to the config directory (~/.panotile).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".panotile")
}

/// Get the path to the config file (~/.panotile/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
