//! Distance-based admission and eviction.
//!
//! A tile is admitted when the squared distance from the viewport point to
//! its center is at most `threshold`, and evicted once that distance exceeds
//! `threshold + hysteresis`. Between the two boundaries nothing changes, so a
//! viewport resting on a cell boundary cannot flap a tile on and off. With
//! `hysteresis = 0` this is the plain single-threshold rule.

use std::time::Duration;

/// Default admission threshold on squared distance.
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Tunables for the scheduling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Squared-distance admission threshold (T).
    pub threshold: f64,
    /// Extra squared distance beyond T before eviction.
    pub hysteresis: f64,
    /// How long a tile must stay beyond the eviction boundary, measured on
    /// sample timestamps, before it is deactivated.
    pub dwell: Duration,
    /// Also admit tiles near the forecast viewport point.
    pub use_prediction: bool,
    /// Minimum time after a fetch failure before the tile is fetched again.
    pub retry_cooldown: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            hysteresis: 0.0,
            dwell: Duration::ZERO,
            use_prediction: false,
            retry_cooldown: Duration::ZERO,
        }
    }
}

/// Where a tile sits relative to the admission boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    /// Within the admission threshold.
    Inside,
    /// Between the admission and eviction boundaries.
    Band,
    /// Beyond the eviction boundary.
    Outside,
}

/// Classifies squared distances against the configured boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionPolicy {
    threshold: f64,
    eviction: f64,
}

impl AdmissionPolicy {
    /// Negative hysteresis is treated as zero.
    pub fn new(threshold: f64, hysteresis: f64) -> Self {
        Self {
            threshold,
            eviction: threshold + hysteresis.max(0.0),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.threshold, config.hysteresis)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn eviction_boundary(&self) -> f64 {
        self.eviction
    }

    pub fn classify(&self, distance_squared: f64) -> Proximity {
        if distance_squared <= self.threshold {
            Proximity::Inside
        } else if distance_squared <= self.eviction {
            Proximity::Band
        } else {
            Proximity::Outside
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_is_inclusive() {
        let policy = AdmissionPolicy::new(0.1, 0.0);
        assert_eq!(policy.classify(0.1), Proximity::Inside);
        assert_eq!(policy.classify(0.1000001), Proximity::Outside);
    }

    #[test]
    fn test_hysteresis_band() {
        let policy = AdmissionPolicy::new(0.1, 0.05);
        assert_eq!(policy.classify(0.05), Proximity::Inside);
        assert_eq!(policy.classify(0.12), Proximity::Band);
        assert_eq!(policy.classify(0.15), Proximity::Band);
        assert_eq!(policy.classify(0.2), Proximity::Outside);
    }

    #[test]
    fn test_negative_hysteresis_ignored() {
        let policy = AdmissionPolicy::new(0.1, -1.0);
        assert_eq!(policy.eviction_boundary(), 0.1);
    }

    #[test]
    fn test_default_config_is_baseline_rule() {
        let config = SchedulerConfig::default();
        assert_eq!(config.threshold, 0.1);
        assert_eq!(config.hysteresis, 0.0);
        assert_eq!(config.dwell, Duration::ZERO);
        assert!(!config.use_prediction);
    }
}
