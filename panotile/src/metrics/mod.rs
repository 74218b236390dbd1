//! Per-tile operational metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐   snapshot()   ┌───────────────────┐  publish()  ┌───────────────┐
//! │ TilePipelines  │ ◄───────────── │ MetricsAggregator │ ──────────► │ TelemetrySink │
//! │ + BaseStream   │                └───────────────────┘             └───────────────┘
//! └────────────────┘                          ▲
//!                                             │ interval tick
//!                                     ┌───────────────┐
//!                                     │ MetricsPoller │
//!                                     └───────────────┘
//! ```
//!
//! Snapshots are immutable values; consumers get a fresh one per request.

mod aggregator;
mod poller;
mod snapshot;

pub use aggregator::MetricsAggregator;
pub use poller::{LatestSnapshot, MetricsConfig, MetricsPoller, DEFAULT_METRICS_INTERVAL};
pub use snapshot::{MetricsSnapshot, TileMetricsEntry};
