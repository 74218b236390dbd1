//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Tile admission and eviction
    pub scheduler: SchedulerSettings,
    /// Trajectory prediction
    pub predictor: PredictorSettings,
    /// Metrics polling
    pub metrics: MetricsSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    /// Squared-distance admission threshold
    pub threshold: f64,
    /// Extra squared distance before eviction
    pub hysteresis: f64,
    /// Time beyond the eviction boundary before deactivating (milliseconds)
    pub dwell_ms: u64,
    /// Admit tiles near the forecast viewport point as well
    pub use_prediction: bool,
    /// Delay before refetching a failed tile (milliseconds)
    pub retry_cooldown_ms: u64,
}

/// Predictor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorSettings {
    /// Samples per regression window
    pub window: usize,
    /// Forecast steps per fit
    pub horizon: usize,
    /// Trajectory trace entries kept
    pub trace_capacity: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSettings {
    /// Snapshot interval (milliseconds)
    pub interval_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
