//! Shared scheduler status for UIs and reports.
//!
//! The scheduling loop owns its state exclusively; after every event it
//! publishes a copy here so other tasks can read it without touching the loop.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::coord::{NormalizedPoint, TileId};
use crate::viewport::{PredictionStats, TraceEntry};

/// Counters maintained by the scheduling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SchedulerStats {
    /// Viewport samples processed.
    pub updates: u64,
    /// Activate commands that changed a tile.
    pub activations: u64,
    /// Deactivate commands that changed a tile.
    pub deactivations: u64,
    /// Tiles torn down by command.
    pub teardowns: u64,
    /// Readiness callbacks dropped as stale.
    pub stale_callbacks: u64,
    /// Fetch failures applied to a tile.
    pub fetch_failures: u64,
    /// Events rejected with an error.
    pub rejected_events: u64,
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatusSnapshot {
    pub running: bool,
    pub last_point: Option<NormalizedPoint>,
    pub predicted_point: Option<NormalizedPoint>,
    pub stats: SchedulerStats,
    pub pinned: Vec<TileId>,
    pub prediction: PredictionStats,
    pub trace: Vec<TraceEntry>,
}

/// Lock-protected scheduler status shared across tasks.
#[derive(Debug, Default)]
pub struct SharedSchedulerStatus {
    inner: RwLock<SchedulerStatusSnapshot>,
}

impl SharedSchedulerStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the published snapshot.
    pub fn publish(&self, snapshot: SchedulerStatusSnapshot) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = snapshot;
        }
    }

    /// Pinned tiles of the latest snapshot, without copying the rest.
    pub fn pinned(&self) -> Vec<TileId> {
        self.inner
            .read()
            .map(|inner| inner.pinned.clone())
            .unwrap_or_default()
    }

    /// Copy of the latest snapshot.
    pub fn snapshot(&self) -> SchedulerStatusSnapshot {
        self.inner
            .read()
            .map(|inner| inner.clone())
            .unwrap_or_default()
    }
}
