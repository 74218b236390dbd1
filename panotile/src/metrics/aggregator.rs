//! Collects per-tile metrics into snapshots.

use std::sync::Arc;
use std::time::Instant;

use super::{MetricsSnapshot, TileMetricsEntry};
use crate::media::BaseStream;
use crate::pipeline::TileArena;

/// Queries every pipeline and the base stream; never mutates pipeline state.
///
/// Pipelines answer from their last-known values while no player is
/// attached, so a tile changing state mid-query never fails the snapshot.
#[derive(Clone)]
pub struct MetricsAggregator {
    arena: Arc<TileArena>,
    base: Arc<dyn BaseStream>,
}

impl MetricsAggregator {
    pub fn new(arena: Arc<TileArena>, base: Arc<dyn BaseStream>) -> Self {
        Self { arena, base }
    }

    /// Produce a fresh snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let tiles = self
            .arena
            .iter()
            .map(|tile| {
                let metrics = tile.metrics();
                TileMetricsEntry {
                    id: tile.id().index(),
                    state: tile.state(),
                    buffer_length: metrics.buffer_length,
                    quality: metrics.quality,
                    throughput: metrics.throughput,
                }
            })
            .collect();

        MetricsSnapshot {
            tiles,
            base_buffer_length: self.base.buffer_length(),
            taken_at: Instant::now(),
        }
    }
}
