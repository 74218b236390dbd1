//! Session-wide arena of tile pipelines.

use std::sync::Arc;

use serde::Serialize;

use super::{TilePipeline, TileState};
use crate::coord::{CellRect, TileGrid, TileId};
use crate::error::EngineError;
use crate::media::MediaBackend;
use crate::scheduler::EventSender;
use crate::sync::SyncCoordinator;

/// A tile the compositor should draw over the base stream.
///
/// `x` and `width` run along longitude, `y` and `height` along latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawRegion {
    pub tile: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DrawRegion {
    fn new(tile: TileId, rect: CellRect) -> Self {
        Self {
            tile: tile.index(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// All pipelines of one session, indexed by [`TileId`].
///
/// Created once at session start; the set of tiles never changes.
#[derive(Debug)]
pub struct TileArena {
    grid: TileGrid,
    tiles: Vec<TilePipeline>,
}

impl TileArena {
    /// Build one pipeline per grid cell.
    ///
    /// `urls` is indexed by tile id; tiles without a URL get an empty one and
    /// will fail to load.
    pub fn new(
        grid: TileGrid,
        urls: &[String],
        media: Arc<dyn MediaBackend>,
        sync: Arc<SyncCoordinator>,
        events: EventSender,
    ) -> Self {
        let tiles = grid
            .iter()
            .map(|(id, center)| {
                let url = urls.get(id.index()).cloned().unwrap_or_default();
                TilePipeline::new(
                    id,
                    center,
                    url,
                    Arc::clone(&media),
                    Arc::clone(&sync),
                    events.clone(),
                )
            })
            .collect();

        Self { grid, tiles }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Look up a tile, rejecting ids outside the grid.
    pub fn get(&self, id: TileId) -> Result<&TilePipeline, EngineError> {
        self.tiles.get(id.index()).ok_or(EngineError::UnknownTile {
            tile: id,
            tile_count: self.tiles.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TilePipeline> {
        self.tiles.iter()
    }

    /// States of every tile in id order.
    pub fn states(&self) -> Vec<TileState> {
        self.tiles.iter().map(TilePipeline::state).collect()
    }

    /// Tiles currently in `state`.
    pub fn in_state(&self, state: TileState) -> Vec<TileId> {
        self.tiles
            .iter()
            .filter(|t| t.state() == state)
            .map(TilePipeline::id)
            .collect()
    }

    /// `Active` tiles with their cell on the equirectangular texture.
    pub fn drawable(&self) -> Vec<DrawRegion> {
        self.tiles
            .iter()
            .filter(|t| t.state() == TileState::Active)
            .filter_map(|t| {
                self.grid
                    .texture_rect(t.id())
                    .map(|r| DrawRegion::new(t.id(), r))
            })
            .collect()
    }
}
