//! Contracts for the external media collaborators.
//!
//! The engine never decodes video itself. Each tile's adaptive-bitrate player
//! is reached through [`MediaBackend`], the always-on base stream through
//! [`BaseStream`], and metrics leave the engine through [`TelemetrySink`].
//!
//! Player creation is fire-and-forget: `create` returns a handle immediately
//! and the backend later reports "can start playback" or a fetch failure
//! through the [`ReadinessNotifier`] it was given. The notifier posts onto the
//! session event queue, so readiness is always handled by the scheduling loop.

mod simulated;

#[cfg(test)]
pub(crate) mod testing;

pub use simulated::{default_ladder, SimulatedBaseStream, SimulatedMedia};

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::coord::TileId;
use crate::metrics::MetricsSnapshot;
use crate::scheduler::EventSender;

/// Opaque handle to one backend player instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaHandle(pub u64);

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// One representation in a tile's bitrate ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bitrate {
    /// Bits per second.
    pub bitrate: u64,
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}x{})", self.bitrate, self.width, self.height)
    }
}

/// Errors reported by a media backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("failed to create player for '{url}': {reason}")]
    CreateFailed { url: String, reason: String },

    #[error("unknown media handle {0}")]
    UnknownHandle(MediaHandle),
}

/// Reports asynchronous load outcomes for one load attempt of one tile.
#[derive(Debug, Clone)]
pub struct ReadinessNotifier {
    events: EventSender,
    tile: TileId,
    epoch: u64,
}

impl ReadinessNotifier {
    pub fn new(events: EventSender, tile: TileId, epoch: u64) -> Self {
        Self {
            events,
            tile,
            epoch,
        }
    }

    pub fn tile(&self) -> TileId {
        self.tile
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The player can start playback.
    pub fn ready(&self) {
        self.events.ready_to_play(self.tile, self.epoch);
    }

    /// The player's fetch failed.
    pub fn failed(&self, reason: impl Into<String>) {
        self.events.fetch_failed(self.tile, self.epoch, reason);
    }
}

/// Per-tile adaptive-bitrate player capability.
///
/// Control calls must not block; any I/O happens on the backend's own tasks.
pub trait MediaBackend: Send + Sync {
    /// Create a player bound to `url` and begin fetching.
    fn create(&self, url: &str, notifier: ReadinessNotifier) -> Result<MediaHandle, MediaError>;

    /// Move the player's local clock to `position` seconds.
    fn seek(&self, handle: MediaHandle, position: f64) -> Result<(), MediaError>;

    fn play(&self, handle: MediaHandle) -> Result<(), MediaError>;

    fn pause(&self, handle: MediaHandle) -> Result<(), MediaError>;

    /// Release the player and everything it fetched.
    fn reset(&self, handle: MediaHandle) -> Result<(), MediaError>;

    fn set_quality(&self, handle: MediaHandle, level: usize) -> Result<(), MediaError>;

    fn quality(&self, handle: MediaHandle) -> Option<usize>;

    /// Seconds of media buffered ahead of the play head.
    fn buffer_length(&self, handle: MediaHandle) -> Option<f64>;

    /// Average throughput in kbit/s.
    fn throughput(&self, handle: MediaHandle) -> Option<f64>;

    fn bitrate_ladder(&self, handle: MediaHandle) -> Vec<Bitrate>;
}

/// The always-on, full-sphere base stream.
pub trait BaseStream: Send + Sync {
    /// Current playback position in seconds, once known.
    fn current_time(&self) -> Option<f64>;

    /// Seconds buffered ahead of the play head.
    fn buffer_length(&self) -> f64;
}

/// Receives periodic metrics snapshots.
pub trait TelemetrySink: Send + Sync {
    fn publish(&self, snapshot: &MetricsSnapshot);
}
