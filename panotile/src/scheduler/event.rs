//! Session event queue.
//!
//! Every input to the scheduling loop, whether a viewport sample, a media
//! collaborator callback or a UI command, is posted here as a typed
//! [`SessionEvent`]. The loop drains the queue one event at a time in arrival
//! order, so no handler ever runs concurrently with another.
//!
//! [`EventSender`] is cheap to clone and fire-and-forget: posting after the
//! loop has shut down is silently ignored.

use tokio::sync::mpsc;

use crate::coord::TileId;
use crate::viewport::ViewportSample;

/// Input processed by the scheduling loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// New orientation sample from the viewport source.
    Viewport(ViewportSample),

    /// A tile's media pipeline can start playback.
    ///
    /// `epoch` identifies the load attempt; callbacks from superseded attempts
    /// are dropped by the pipeline.
    ReadyToPlay { tile: TileId, epoch: u64 },

    /// A tile's media fetch failed.
    FetchFailed {
        tile: TileId,
        epoch: u64,
        reason: String,
    },

    /// The base stream can play; re-broadcast its position to the timeline.
    BaseReady { position: f64, rate: f64 },

    /// Manually select (activate and pin) a tile.
    Select(TileId),

    /// Release a manual selection and unload the tile.
    Unselect(TileId),

    /// Force a tile's quality level.
    SetQuality { tile: TileId, level: usize },

    /// Raise or lower a tile's quality by `delta` steps.
    StepQuality { tile: TileId, delta: i32 },
}

impl SessionEvent {
    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Viewport(_) => "viewport",
            Self::ReadyToPlay { .. } => "ready_to_play",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::BaseReady { .. } => "base_ready",
            Self::Select(_) => "select",
            Self::Unselect(_) => "unselect",
            Self::SetQuality { .. } => "set_quality",
            Self::StepQuality { .. } => "step_quality",
        }
    }
}

/// Handle for posting events to the scheduling loop.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    /// Post an event. Returns `false` if the loop has shut down.
    #[inline]
    pub fn send(&self, event: SessionEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    #[inline]
    pub fn viewport(&self, sample: ViewportSample) {
        self.send(SessionEvent::Viewport(sample));
    }

    #[inline]
    pub fn ready_to_play(&self, tile: TileId, epoch: u64) {
        self.send(SessionEvent::ReadyToPlay { tile, epoch });
    }

    #[inline]
    pub fn fetch_failed(&self, tile: TileId, epoch: u64, reason: impl Into<String>) {
        self.send(SessionEvent::FetchFailed {
            tile,
            epoch,
            reason: reason.into(),
        });
    }

    #[inline]
    pub fn base_ready(&self, position: f64, rate: f64) {
        self.send(SessionEvent::BaseReady { position, rate });
    }

    #[inline]
    pub fn select(&self, tile: TileId) {
        self.send(SessionEvent::Select(tile));
    }

    #[inline]
    pub fn unselect(&self, tile: TileId) {
        self.send(SessionEvent::Unselect(tile));
    }

    #[inline]
    pub fn set_quality(&self, tile: TileId, level: usize) {
        self.send(SessionEvent::SetQuality { tile, level });
    }

    #[inline]
    pub fn step_quality(&self, tile: TileId, delta: i32) {
        self.send(SessionEvent::StepQuality { tile, delta });
    }

    /// Whether the receiving loop has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a connected sender/receiver pair.
pub fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender::new(tx), rx)
}
