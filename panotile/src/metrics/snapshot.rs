//! Immutable metrics snapshots.

use std::time::Instant;

use serde::Serialize;

use crate::pipeline::TileState;

/// Metrics of one tile at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileMetricsEntry {
    pub id: usize,
    pub state: TileState,
    pub buffer_length: f64,
    pub quality: Option<usize>,
    pub throughput: f64,
}

/// Consolidated per-tile metrics plus the base stream's buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Tiles in id order.
    pub tiles: Vec<TileMetricsEntry>,
    pub base_buffer_length: f64,
    #[serde(skip)]
    pub taken_at: Instant,
}

impl MetricsSnapshot {
    /// Buffer lengths in id order with the base stream's appended last.
    pub fn buffer_lengths(&self) -> Vec<f64> {
        self.tiles
            .iter()
            .map(|t| t.buffer_length)
            .chain(std::iter::once(self.base_buffer_length))
            .collect()
    }

    /// Combined throughput of every tile in kbit/s.
    pub fn total_throughput(&self) -> f64 {
        self.tiles.iter().map(|t| t.throughput).sum()
    }

    pub fn tile(&self, id: usize) -> Option<&TileMetricsEntry> {
        self.tiles.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: usize, buffer_length: f64, throughput: f64) -> TileMetricsEntry {
        TileMetricsEntry {
            id,
            state: TileState::Active,
            buffer_length,
            quality: Some(0),
            throughput,
        }
    }

    #[test]
    fn test_base_buffer_is_last() {
        let snapshot = MetricsSnapshot {
            tiles: vec![entry(0, 1.0, 100.0), entry(1, 2.0, 50.0)],
            base_buffer_length: 9.0,
            taken_at: Instant::now(),
        };
        assert_eq!(snapshot.buffer_lengths(), vec![1.0, 2.0, 9.0]);
        assert_eq!(snapshot.total_throughput(), 150.0);
        assert_eq!(snapshot.tile(1).unwrap().buffer_length, 2.0);
    }

    #[test]
    fn test_serializes_without_timestamp() {
        let snapshot = MetricsSnapshot {
            tiles: vec![entry(0, 1.5, 10.0)],
            base_buffer_length: 3.0,
            taken_at: Instant::now(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["base_buffer_length"], 3.0);
        assert_eq!(json["tiles"][0]["state"], "Active");
        assert!(json.get("taken_at").is_none());
    }
}
