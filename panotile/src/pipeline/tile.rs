//! Per-tile media pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::state::{Stage, TileMetrics, TileState};
use crate::coord::{NormalizedPoint, TileId};
use crate::error::EngineError;
use crate::media::{Bitrate, MediaBackend, MediaError, MediaHandle, ReadinessNotifier};
use crate::scheduler::EventSender;
use crate::sync::SyncCoordinator;

#[derive(Debug)]
struct PipelineInner {
    stage: Stage,
    /// Load attempt counter; readiness callbacks carry the epoch they were
    /// issued for and are dropped when it no longer matches.
    epoch: u64,
    /// Start playback as soon as the player reports ready.
    play_when_ready: bool,
    /// Playing without an anchor; re-anchor on the next timeline broadcast.
    anchor_pending: bool,
    cached: TileMetrics,
    failures: u32,
    last_failure: Option<Instant>,
    last_error: Option<String>,
}

impl PipelineInner {
    fn new() -> Self {
        Self {
            stage: Stage::Unloaded,
            epoch: 0,
            play_when_ready: false,
            anchor_pending: false,
            cached: TileMetrics::default(),
            failures: 0,
            last_failure: None,
            last_error: None,
        }
    }
}

/// Owns one tile's fetch/decode/playback lifecycle.
///
/// Every command is safe in every state: commands that do not apply to the
/// current state are no-ops and return `false`. The state is only ever
/// changed by this type, in response to commands or collaborator callbacks.
pub struct TilePipeline {
    id: TileId,
    center: NormalizedPoint,
    url: String,
    media: Arc<dyn MediaBackend>,
    sync: Arc<SyncCoordinator>,
    events: EventSender,
    inner: Mutex<PipelineInner>,
}

impl std::fmt::Debug for TilePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TilePipeline")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl TilePipeline {
    pub fn new(
        id: TileId,
        center: NormalizedPoint,
        url: impl Into<String>,
        media: Arc<dyn MediaBackend>,
        sync: Arc<SyncCoordinator>,
        events: EventSender,
    ) -> Self {
        Self {
            id,
            center,
            url: url.into(),
            media,
            sync,
            events,
            inner: Mutex::new(PipelineInner::new()),
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn center(&self) -> NormalizedPoint {
        self.center
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> TileState {
        self.inner.lock().stage.state()
    }

    /// Current load attempt number.
    pub fn epoch(&self) -> u64 {
        self.inner.lock().epoch
    }

    /// Fetch failures since session start.
    pub fn failures(&self) -> u32 {
        self.inner.lock().failures
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    /// Whether an activation may start a new fetch at `now`.
    ///
    /// `now` must come from the same clock the failure was stamped with.
    pub fn retry_allowed(&self, now: Instant, cooldown: Duration) -> bool {
        self.inner
            .lock()
            .last_failure
            .map_or(true, |at| now.saturating_duration_since(at) >= cooldown)
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    /// Move towards `Active`.
    ///
    /// `Unloaded` starts a fetch, `Loading` arranges to play once ready,
    /// `Ready`/`Paused` resume playback anchored to the shared timeline.
    /// Already `Active` is a no-op.
    pub fn activate(&self) -> bool {
        self.activate_at(Instant::now())
    }

    /// [`activate`](Self::activate), stamping a failed fetch start with `at`.
    pub fn activate_at(&self, at: Instant) -> bool {
        let mut inner = self.inner.lock();
        match inner.stage {
            Stage::Unloaded => self.begin_load(&mut inner, at),
            Stage::Loading(_) => {
                let changed = !inner.play_when_ready;
                inner.play_when_ready = true;
                changed
            }
            Stage::Ready(handle) | Stage::Paused(handle) => {
                self.start_playback(&mut inner, handle);
                true
            }
            Stage::Active(_) => false,
        }
    }

    /// Pause an `Active` tile, keeping its fetched session for a quick return.
    ///
    /// A `Loading` tile just forgets that it should start playing.
    pub fn deactivate(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.stage {
            Stage::Active(handle) => {
                inner.cached = self.read_metrics(handle, inner.cached);
                self.log_media_error(self.media.pause(handle), "pause");
                self.sync.unregister(self.id);
                inner.stage = Stage::Paused(handle);
                inner.anchor_pending = false;
                debug!(tile = %self.id, %handle, "Tile paused");
                true
            }
            Stage::Loading(_) => {
                let changed = inner.play_when_ready;
                inner.play_when_ready = false;
                changed
            }
            Stage::Unloaded | Stage::Ready(_) | Stage::Paused(_) => false,
        }
    }

    /// Release the player and sync registration from any state.
    ///
    /// Bumps the epoch so a readiness callback still in flight is ignored.
    pub fn teardown(&self) -> bool {
        let mut inner = self.inner.lock();
        let Some(handle) = inner.stage.handle() else {
            return false;
        };

        self.log_media_error(self.media.reset(handle), "reset");
        self.sync.unregister(self.id);
        inner.stage = Stage::Unloaded;
        inner.epoch += 1;
        inner.play_when_ready = false;
        inner.anchor_pending = false;
        inner.cached = TileMetrics::default();
        debug!(tile = %self.id, %handle, epoch = inner.epoch, "Tile torn down");
        true
    }

    /// Handle the collaborator's "can start playback" signal.
    pub fn on_ready(&self, epoch: u64) -> bool {
        let mut inner = self.inner.lock();
        let handle = match inner.stage {
            Stage::Loading(handle) if inner.epoch == epoch => handle,
            stage => {
                trace!(
                    tile = %self.id,
                    epoch,
                    current_epoch = inner.epoch,
                    state = %stage.state(),
                    "Ignoring stale readiness callback"
                );
                return false;
            }
        };

        inner.stage = Stage::Ready(handle);
        debug!(tile = %self.id, %handle, "Tile ready");
        if inner.play_when_ready {
            self.start_playback(&mut inner, handle);
        }
        true
    }

    /// Handle a fetch failure reported by the collaborator.
    ///
    /// The tile returns to `Unloaded`; the scheduler retries on a later update.
    /// `at` stamps the failure for the retry cooldown.
    pub fn on_fetch_failed(&self, epoch: u64, reason: &str, at: Instant) -> bool {
        let mut inner = self.inner.lock();
        let handle = match inner.stage {
            Stage::Loading(handle) if inner.epoch == epoch => handle,
            _ => {
                trace!(tile = %self.id, epoch, "Ignoring stale fetch failure");
                return false;
            }
        };

        if let Err(e) = self.media.reset(handle) {
            trace!(tile = %self.id, error = %e, "Failed player already released");
        }
        inner.stage = Stage::Unloaded;
        inner.epoch += 1;
        inner.play_when_ready = false;
        self.record_failure(
            &mut inner,
            EngineError::FetchFailed {
                tile: self.id,
                reason: reason.to_string(),
            },
            at,
        );
        true
    }

    /// Seek an `Active` tile to the shared timeline again.
    pub fn reanchor(&self) -> bool {
        let mut inner = self.inner.lock();
        let Stage::Active(handle) = inner.stage else {
            return false;
        };
        self.anchor(&mut inner, handle)
    }

    /// Force a quality level. No-op before the tile is `Ready`.
    pub fn set_quality(&self, level: usize) -> bool {
        let mut inner = self.inner.lock();
        let Some(handle) = inner.stage.playable_handle() else {
            trace!(tile = %self.id, level, "set_quality ignored before ready");
            return false;
        };
        self.apply_quality(&mut inner, handle, level)
    }

    /// Move the quality level by `delta` rungs, clamped to the bitrate ladder.
    pub fn step_quality(&self, delta: i32) -> bool {
        let mut inner = self.inner.lock();
        let Some(handle) = inner.stage.playable_handle() else {
            return false;
        };

        let rungs = self.media.bitrate_ladder(handle).len();
        if rungs == 0 {
            return false;
        }
        let current = self.media.quality(handle).unwrap_or(0);
        let target = (current as i64 + delta as i64).clamp(0, rungs as i64 - 1) as usize;
        if target == current {
            return false;
        }
        self.apply_quality(&mut inner, handle, target)
    }

    // ---------------------------------------------------------------------
    // Read accessors; safe in any state
    // ---------------------------------------------------------------------

    /// Live metrics, or the last-known values when no player is attached.
    pub fn metrics(&self) -> TileMetrics {
        let mut inner = self.inner.lock();
        match inner.stage.handle() {
            Some(handle) => {
                inner.cached = self.read_metrics(handle, inner.cached);
                inner.cached
            }
            None => inner.cached,
        }
    }

    pub fn quality(&self) -> Option<usize> {
        self.metrics().quality
    }

    pub fn buffer_length(&self) -> f64 {
        self.metrics().buffer_length
    }

    pub fn throughput(&self) -> f64 {
        self.metrics().throughput
    }

    /// Available representations; empty without a player.
    pub fn bitrate_ladder(&self) -> Vec<Bitrate> {
        let inner = self.inner.lock();
        inner
            .stage
            .handle()
            .map(|h| self.media.bitrate_ladder(h))
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Internals; callers hold the lock
    // ---------------------------------------------------------------------

    fn begin_load(&self, inner: &mut PipelineInner, at: Instant) -> bool {
        inner.epoch += 1;
        let notifier = ReadinessNotifier::new(self.events.clone(), self.id, inner.epoch);
        match self.media.create(&self.url, notifier) {
            Ok(handle) => {
                inner.stage = Stage::Loading(handle);
                inner.play_when_ready = true;
                debug!(tile = %self.id, %handle, epoch = inner.epoch, "Tile loading");
                true
            }
            Err(e) => {
                let tile = self.id;
                self.record_failure(
                    inner,
                    EngineError::FetchFailed {
                        tile,
                        reason: e.to_string(),
                    },
                    at,
                );
                false
            }
        }
    }

    fn start_playback(&self, inner: &mut PipelineInner, handle: MediaHandle) {
        self.anchor(inner, handle);
        self.log_media_error(self.media.play(handle), "play");
        self.sync.register(self.id);
        inner.stage = Stage::Active(handle);
        inner.play_when_ready = false;
        debug!(
            tile = %self.id,
            %handle,
            anchored = !inner.anchor_pending,
            "Tile active"
        );
    }

    fn anchor(&self, inner: &mut PipelineInner, handle: MediaHandle) -> bool {
        match self.sync.anchor(self.id) {
            Ok(position) => {
                self.log_media_error(self.media.seek(handle, position), "seek");
                inner.anchor_pending = false;
                true
            }
            Err(e) => {
                debug!(error = %e, "Anchoring deferred until the timeline is seeded");
                inner.anchor_pending = true;
                false
            }
        }
    }

    fn apply_quality(&self, inner: &mut PipelineInner, handle: MediaHandle, level: usize) -> bool {
        match self.media.set_quality(handle, level) {
            Ok(()) => {
                inner.cached.quality = Some(level);
                debug!(tile = %self.id, level, "Tile quality set");
                true
            }
            Err(e) => {
                warn!(tile = %self.id, level, error = %e, "Failed to set tile quality");
                false
            }
        }
    }

    fn read_metrics(&self, handle: MediaHandle, last: TileMetrics) -> TileMetrics {
        TileMetrics {
            buffer_length: self.media.buffer_length(handle).unwrap_or(last.buffer_length),
            quality: self.media.quality(handle).or(last.quality),
            throughput: self.media.throughput(handle).unwrap_or(last.throughput),
        }
    }

    fn record_failure(&self, inner: &mut PipelineInner, error: EngineError, at: Instant) {
        inner.failures += 1;
        inner.last_failure = Some(at);
        warn!(tile = %self.id, failures = inner.failures, error = %error, "Tile fetch failed");
        inner.last_error = Some(error.to_string());
    }

    fn log_media_error(&self, result: Result<(), MediaError>, op: &'static str) {
        if let Err(e) = result {
            warn!(tile = %self.id, op, error = %e, "Media command failed");
        }
    }
}
