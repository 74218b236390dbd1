//! Tile lifecycle states.

use std::fmt;

use serde::Serialize;

use crate::media::MediaHandle;

/// Externally visible lifecycle state of a tile.
///
/// ```text
/// Unloaded ──activate──► Loading ──ready──► Ready ──activate──► Active
///    ▲                      │                                  │  ▲
///    │                  fetch failed                 deactivate│  │activate
///    │                      ▼                                  ▼  │
///    └──────────────── Unloaded ◄────────teardown (any)─────── Paused
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TileState {
    Unloaded,
    Loading,
    Ready,
    Active,
    Paused,
}

impl TileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileState::Unloaded => "unloaded",
            TileState::Loading => "loading",
            TileState::Ready => "ready",
            TileState::Active => "active",
            TileState::Paused => "paused",
        }
    }

    /// Whether the tile holds a media handle in this state.
    pub fn has_media(&self) -> bool {
        !matches!(self, TileState::Unloaded)
    }
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal state carrying the media handle wherever one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Unloaded,
    Loading(MediaHandle),
    Ready(MediaHandle),
    Active(MediaHandle),
    Paused(MediaHandle),
}

impl Stage {
    pub(crate) fn state(&self) -> TileState {
        match self {
            Stage::Unloaded => TileState::Unloaded,
            Stage::Loading(_) => TileState::Loading,
            Stage::Ready(_) => TileState::Ready,
            Stage::Active(_) => TileState::Active,
            Stage::Paused(_) => TileState::Paused,
        }
    }

    pub(crate) fn handle(&self) -> Option<MediaHandle> {
        match *self {
            Stage::Unloaded => None,
            Stage::Loading(h) | Stage::Ready(h) | Stage::Active(h) | Stage::Paused(h) => Some(h),
        }
    }

    /// Handle of a player that has reached `Ready` at least once.
    pub(crate) fn playable_handle(&self) -> Option<MediaHandle> {
        match *self {
            Stage::Ready(h) | Stage::Active(h) | Stage::Paused(h) => Some(h),
            Stage::Unloaded | Stage::Loading(_) => None,
        }
    }
}

/// Last-known operational metrics of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TileMetrics {
    /// Seconds buffered ahead of the play head.
    pub buffer_length: f64,
    /// Selected quality level, if known.
    pub quality: Option<usize>,
    /// Average throughput in kbit/s.
    pub throughput: f64,
}
