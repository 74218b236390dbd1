//! Viewer orientation samples and short-horizon trajectory prediction.
//!
//! ```text
//! orientation (lat, lon) ─► ViewportSample ─► NormalizedPoint
//!                                                  │
//!                                     TrajectoryPredictor (N-sample windows)
//!                                                  │
//!                                        Forecast (M future points)
//! ```

mod predictor;
mod trace;

pub use predictor::{
    fit_window, Forecast, PredictionStats, PredictorConfig, TrajectoryPredictor,
    DEFAULT_HORIZON, DEFAULT_WINDOW,
};
pub use trace::{RingBuffer, TraceEntry, DEFAULT_TRACE_CAPACITY};

use std::time::Instant;

use crate::coord::{to_viewport_point, NormalizedPoint};

/// One orientation sample from the external viewport source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSample {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// When the sample was taken.
    pub timestamp: Instant,
}

impl ViewportSample {
    /// Create a sample stamped with the current time.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self::at(latitude, longitude, Instant::now())
    }

    /// Create a sample with an explicit timestamp.
    pub fn at(latitude: f64, longitude: f64, timestamp: Instant) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    /// The sample projected into normalized grid space (always clamped).
    #[inline]
    pub fn point(&self) -> NormalizedPoint {
        to_viewport_point(self.latitude, self.longitude)
    }
}
