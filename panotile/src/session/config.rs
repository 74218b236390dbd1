//! Runtime configuration for a playback session.

use crate::config::ConfigFile;
use crate::metrics::MetricsConfig;
use crate::scheduler::SchedulerConfig;
use crate::viewport::{PredictorConfig, DEFAULT_TRACE_CAPACITY};

/// Everything a session needs besides its manifest and collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub scheduler: SchedulerConfig,
    pub predictor: PredictorConfig,
    /// Trajectory trace entries kept.
    pub trace_capacity: usize,
    pub metrics: MetricsConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            predictor: PredictorConfig::default(),
            trace_capacity: DEFAULT_TRACE_CAPACITY,
            metrics: MetricsConfig::default(),
        }
    }
}

impl From<&ConfigFile> for SessionConfig {
    fn from(config: &ConfigFile) -> Self {
        Self {
            scheduler: config.scheduler_config(),
            predictor: config.predictor_config(),
            trace_capacity: config.predictor.trace_capacity,
            metrics: config.metrics_config(),
        }
    }
}
