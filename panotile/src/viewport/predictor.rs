//! Linear trajectory predictor over non-overlapping sample windows.
//!
//! Samples are collected into a window of `N` points, each tagged with its
//! position in the window (0..N). When the window fills, x and y are each fit
//! with an ordinary least-squares line against that counter and the next `M`
//! positions (counters N..N+M) are extrapolated. The window is then cleared,
//! and while the next window fills every new sample is compared against the
//! forecast step with the same counter to track mean absolute error.

use serde::Serialize;
use tracing::{debug, trace};

use crate::coord::NormalizedPoint;
use crate::error::EngineError;

/// Default number of samples per fitting window.
pub const DEFAULT_WINDOW: usize = 5;

/// Default number of forecast steps.
pub const DEFAULT_HORIZON: usize = 5;

/// Predictor sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorConfig {
    /// Samples per window (N).
    pub window: usize,
    /// Forecast steps per fit (M).
    pub horizon: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            horizon: DEFAULT_HORIZON,
        }
    }
}

/// Forecast of the next `M` viewport positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    points: Vec<NormalizedPoint>,
}

impl Forecast {
    /// Forecast points, nearest step first.
    pub fn points(&self) -> &[NormalizedPoint] {
        &self.points
    }

    /// Point for a forecast step, if within the horizon.
    pub fn at(&self, step: usize) -> Option<NormalizedPoint> {
        self.points.get(step).copied()
    }

    /// Point for a forecast step, clamped to the last step of the horizon.
    pub fn aligned(&self, step: usize) -> Option<NormalizedPoint> {
        self.points
            .get(step.min(self.points.len().saturating_sub(1)))
            .copied()
    }

    /// Furthest forecast point.
    pub fn last(&self) -> Option<NormalizedPoint> {
        self.points.last().copied()
    }
}

/// Running accuracy of published forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PredictionStats {
    /// Mean absolute error of x over all compared samples.
    pub mae_x: f64,
    /// Mean absolute error of y over all compared samples.
    pub mae_y: f64,
    /// Samples compared against a forecast.
    pub compared: u64,
    /// Forecasts published.
    pub forecasts: u64,
    /// Windows that could not be fit.
    pub degenerate: u64,
}

/// Fit a window of samples and extrapolate `horizon` steps past its end.
///
/// Fails with [`EngineError::DegeneratePrediction`] when fewer than two
/// samples are supplied.
pub fn fit_window(samples: &[NormalizedPoint], horizon: usize) -> Result<Forecast, EngineError> {
    if samples.len() < 2 {
        return Err(EngineError::DegeneratePrediction {
            samples: samples.len(),
        });
    }

    let xs: Vec<f64> = samples.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = samples.iter().map(|p| p.y).collect();
    let (slope_x, intercept_x) = least_squares(&xs);
    let (slope_y, intercept_y) = least_squares(&ys);

    let start = samples.len();
    let points = (start..start + horizon)
        .map(|t| {
            let t = t as f64;
            NormalizedPoint::new(slope_x * t + intercept_x, slope_y * t + intercept_y)
        })
        .collect();

    Ok(Forecast { points })
}

/// Slope and intercept of `values` regressed on their indices.
fn least_squares(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean_t = (n - 1.0) / 2.0;
    let mean_v = values.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (t, v) in values.iter().enumerate() {
        let dt = t as f64 - mean_t;
        covariance += dt * (v - mean_v);
        variance += dt * dt;
    }

    let slope = covariance / variance;
    (slope, mean_v - slope * mean_t)
}

/// Windowed linear-regression trajectory predictor.
#[derive(Debug, Clone)]
pub struct TrajectoryPredictor {
    config: PredictorConfig,
    window: Vec<NormalizedPoint>,
    forecast: Option<Forecast>,
    error_x: f64,
    error_y: f64,
    stats: PredictionStats,
}

impl TrajectoryPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            window: Vec::with_capacity(config.window),
            config,
            forecast: None,
            error_x: 0.0,
            error_y: 0.0,
            stats: PredictionStats::default(),
        }
    }

    pub fn config(&self) -> PredictorConfig {
        self.config
    }

    /// Feed one viewport point.
    ///
    /// Returns `true` when this sample completed a window and a new forecast
    /// was published.
    pub fn observe(&mut self, point: NormalizedPoint) -> bool {
        let step = self.window.len();
        if let Some(expected) = self.forecast.as_ref().and_then(|f| f.at(step)) {
            self.error_x += (point.x - expected.x).abs();
            self.error_y += (point.y - expected.y).abs();
            self.stats.compared += 1;
            self.stats.mae_x = self.error_x / self.stats.compared as f64;
            self.stats.mae_y = self.error_y / self.stats.compared as f64;
        }

        self.window.push(point);
        if self.window.len() < self.config.window.max(1) {
            return false;
        }

        let fitted = fit_window(&self.window, self.config.horizon);
        self.window.clear();

        match fitted {
            Ok(forecast) => {
                trace!(
                    steps = forecast.points.len(),
                    mae_x = self.stats.mae_x,
                    mae_y = self.stats.mae_y,
                    "Trajectory forecast published"
                );
                self.forecast = Some(forecast);
                self.stats.forecasts += 1;
                true
            }
            Err(e) => {
                debug!(error = %e, "Trajectory window not fit");
                self.forecast = None;
                self.stats.degenerate += 1;
                false
            }
        }
    }

    /// Latest forecast, if one is available.
    pub fn forecast(&self) -> Option<&Forecast> {
        self.forecast.as_ref()
    }

    /// Forecast point aligned with the sample that will arrive next.
    pub fn predicted_point(&self) -> Option<NormalizedPoint> {
        self.forecast
            .as_ref()
            .and_then(|f| f.aligned(self.window.len()))
    }

    /// Samples in the current (unfit) window.
    pub fn pending_samples(&self) -> usize {
        self.window.len()
    }

    pub fn stats(&self) -> PredictionStats {
        self.stats
    }

    /// Drop the window, forecast and error history.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}
