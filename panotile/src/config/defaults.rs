//! Default values and constants for all configuration settings.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::metrics::DEFAULT_METRICS_INTERVAL;
use crate::scheduler::DEFAULT_THRESHOLD;
use crate::viewport::{DEFAULT_HORIZON, DEFAULT_TRACE_CAPACITY, DEFAULT_WINDOW};

/// Default admission threshold (squared normalized distance).
pub const DEFAULT_SCHEDULER_THRESHOLD: f64 = DEFAULT_THRESHOLD;

/// Default hysteresis band; zero keeps the single-threshold rule.
pub const DEFAULT_SCHEDULER_HYSTERESIS: f64 = 0.0;

/// Default eviction dwell in milliseconds.
pub const DEFAULT_SCHEDULER_DWELL_MS: u64 = 0;

/// Default fetch retry cooldown in milliseconds.
pub const DEFAULT_RETRY_COOLDOWN_MS: u64 = 0;

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "panotile.log";

/// Default log file path (~/.panotile/panotile.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join(DEFAULT_LOG_FILE_NAME)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSettings {
                threshold: DEFAULT_SCHEDULER_THRESHOLD,
                hysteresis: DEFAULT_SCHEDULER_HYSTERESIS,
                dwell_ms: DEFAULT_SCHEDULER_DWELL_MS,
                use_prediction: false,
                retry_cooldown_ms: DEFAULT_RETRY_COOLDOWN_MS,
            },
            predictor: PredictorSettings {
                window: DEFAULT_WINDOW,
                horizon: DEFAULT_HORIZON,
                trace_capacity: DEFAULT_TRACE_CAPACITY,
            },
            metrics: MetricsSettings {
                interval_ms: DEFAULT_METRICS_INTERVAL.as_millis() as u64,
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
