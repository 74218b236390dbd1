//! Tile media pipelines.
//!
//! One [`TilePipeline`] per grid cell owns that tile's player handle and its
//! lifecycle state machine. Pipelines are created once per session and kept
//! in a [`TileArena`] indexed by tile id.
//!
//! # Lifecycle
//!
//! - `activate` on `Unloaded` creates a player and enters `Loading`.
//! - The player's readiness callback moves `Loading` to `Ready`, and straight
//!   on to `Active` if activation is still wanted.
//! - `Active` seeks to the shared timeline, plays and registers for sync.
//! - `deactivate` pauses into `Paused`, keeping everything fetched.
//! - `teardown` releases the player from any state.
//!
//! Callbacks are tagged with the load epoch they belong to. Teardown and fetch
//! failure bump the epoch, so a late callback cannot resurrect a tile.

mod arena;
mod state;
mod tile;

pub use arena::{DrawRegion, TileArena};
pub use state::{TileMetrics, TileState};
pub use tile::TilePipeline;

#[cfg(test)]
mod tests;
