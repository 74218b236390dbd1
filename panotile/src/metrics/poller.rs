//! Interval-driven metrics publication.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{MetricsAggregator, MetricsSnapshot};
use crate::media::TelemetrySink;

/// Default publication interval.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_millis(2000);

/// Metrics polling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    pub interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_METRICS_INTERVAL,
        }
    }
}

/// Publishes a snapshot to a sink on a fixed cadence, independent of the
/// scheduling loop.
pub struct MetricsPoller {
    aggregator: MetricsAggregator,
    sink: Arc<dyn TelemetrySink>,
    interval: Duration,
}

impl MetricsPoller {
    pub fn new(
        aggregator: MetricsAggregator,
        sink: Arc<dyn TelemetrySink>,
        config: MetricsConfig,
    ) -> Self {
        Self {
            aggregator,
            sink,
            // tokio::time::interval panics on a zero period
            interval: config.interval.max(Duration::from_millis(1)),
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Metrics poller starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Metrics poller shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    let snapshot = self.aggregator.snapshot();
                    self.sink.publish(&snapshot);
                }
            }
        }

        // Final snapshot so the sink reflects the last state before shutdown.
        self.sink.publish(&self.aggregator.snapshot());
        debug!("Metrics poller stopped");
    }
}

/// Sink that keeps only the most recent snapshot.
#[derive(Debug, Default)]
pub struct LatestSnapshot {
    latest: RwLock<Option<MetricsSnapshot>>,
    published: RwLock<u64>,
}

impl LatestSnapshot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn latest(&self) -> Option<MetricsSnapshot> {
        self.latest.read().clone()
    }

    /// Snapshots received so far.
    pub fn published(&self) -> u64 {
        *self.published.read()
    }
}

impl TelemetrySink for LatestSnapshot {
    fn publish(&self, snapshot: &MetricsSnapshot) {
        *self.latest.write() = Some(snapshot.clone());
        *self.published.write() += 1;
    }
}
