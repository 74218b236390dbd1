//! Error taxonomy for the tile engine.
//!
//! `FetchFailed`, `SyncAnchorMissing` and `DegeneratePrediction` are recovered
//! where they occur (the tile stays `Unloaded`, anchoring is deferred, no
//! forecast is published). `UnknownTile` is a caller contract violation and is
//! always returned to the caller.

use thiserror::Error;

use crate::coord::TileId;

/// Errors raised by the tile selection, lifecycle and sync engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A tile's media fetch failed while `Loading`.
    #[error("fetch failed for {tile}: {reason}")]
    FetchFailed { tile: TileId, reason: String },

    /// A tile was activated before the shared timeline was seeded.
    #[error("{tile} activated before the shared timeline was seeded")]
    SyncAnchorMissing { tile: TileId },

    /// Not enough samples to fit a trajectory.
    #[error("cannot fit a trajectory from {samples} sample(s)")]
    DegeneratePrediction { samples: usize },

    /// A command referenced a tile id outside the grid.
    #[error("unknown {tile} (grid has {tile_count} tiles)")]
    UnknownTile { tile: TileId, tile_count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tile_message_names_grid_size() {
        let err = EngineError::UnknownTile {
            tile: TileId(12),
            tile_count: 12,
        };
        assert_eq!(err.to_string(), "unknown tile 12 (grid has 12 tiles)");
    }

    #[test]
    fn test_fetch_failed_message_includes_reason() {
        let err = EngineError::FetchFailed {
            tile: TileId(3),
            reason: "404".to_string(),
        };
        assert!(err.to_string().contains("tile 3"));
        assert!(err.to_string().contains("404"));
    }
}
