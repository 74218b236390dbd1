//! The scheduling loop.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::event::SessionEvent;
use super::policy::{AdmissionPolicy, Proximity, SchedulerConfig};
use super::status::{SchedulerStats, SchedulerStatusSnapshot, SharedSchedulerStatus};
use crate::coord::{NormalizedPoint, TileId};
use crate::error::EngineError;
use crate::pipeline::{TileArena, TilePipeline, TileState};
use crate::sync::SyncCoordinator;
use crate::viewport::{
    PredictionStats, PredictorConfig, RingBuffer, TraceEntry, TrajectoryPredictor,
    ViewportSample,
};

/// Decides which tiles play and drives their pipelines.
///
/// Owns the predictor, trace and pinning state exclusively; events are
/// handled one at a time, each to completion. The scheduler never writes tile
/// state directly, it only issues commands to the pipelines.
pub struct TileScheduler {
    arena: Arc<TileArena>,
    sync: Arc<SyncCoordinator>,
    config: SchedulerConfig,
    policy: AdmissionPolicy,
    predictor: TrajectoryPredictor,
    trace: RingBuffer<TraceEntry>,
    /// Per tile: first sample timestamp seen beyond the eviction boundary.
    outside_since: Vec<Option<Instant>>,
    pinned: BTreeSet<TileId>,
    /// Timestamp of the latest viewport sample; failures are stamped with it.
    clock: Option<Instant>,
    last_point: Option<NormalizedPoint>,
    lookahead: Option<NormalizedPoint>,
    stats: SchedulerStats,
    /// Set while [`run`](Self::run) is looping.
    running: bool,
    shared_status: Option<Arc<SharedSchedulerStatus>>,
}

impl TileScheduler {
    pub fn new(
        arena: Arc<TileArena>,
        sync: Arc<SyncCoordinator>,
        config: SchedulerConfig,
        predictor: PredictorConfig,
        trace_capacity: usize,
    ) -> Self {
        let tiles = arena.len();
        Self {
            policy: AdmissionPolicy::from_config(&config),
            arena,
            sync,
            config,
            predictor: TrajectoryPredictor::new(predictor),
            trace: RingBuffer::new(trace_capacity),
            outside_since: vec![None; tiles],
            pinned: BTreeSet::new(),
            clock: None,
            last_point: None,
            lookahead: None,
            stats: SchedulerStats::default(),
            running: false,
            shared_status: None,
        }
    }

    /// Publish status after every event.
    pub fn with_shared_status(mut self, status: Arc<SharedSchedulerStatus>) -> Self {
        self.shared_status = Some(status);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn arena(&self) -> &Arc<TileArena> {
        &self.arena
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn prediction_stats(&self) -> PredictionStats {
        self.predictor.stats()
    }

    pub fn trace(&self) -> Vec<TraceEntry> {
        self.trace.to_vec()
    }

    pub fn pinned(&self) -> Vec<TileId> {
        self.pinned.iter().copied().collect()
    }

    pub fn is_pinned(&self, tile: TileId) -> bool {
        self.pinned.contains(&tile)
    }

    /// Run the loop until cancelled or the queue closes, then tear down
    /// every tile.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
        cancellation_token: CancellationToken,
    ) {
        info!(
            tiles = self.arena.len(),
            threshold = self.config.threshold,
            hysteresis = self.config.hysteresis,
            dwell_ms = self.config.dwell.as_millis() as u64,
            prediction = self.config.use_prediction,
            "Tile scheduler started"
        );
        self.running = true;
        self.publish_status();

        loop {
            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => {
                    info!("Tile scheduler shutting down");
                    break;
                }

                event = events.recv() => {
                    let Some(event) = event else {
                        info!("Event queue closed, tile scheduler stopping");
                        break;
                    };
                    let kind = event.kind();
                    if let Err(e) = self.handle_event(event) {
                        warn!(event = kind, error = %e, "Event rejected");
                    }
                }
            }
        }

        self.running = false;
        self.teardown_all();
    }

    /// Apply one event.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<(), EngineError> {
        let result = match event {
            SessionEvent::Viewport(sample) => {
                self.on_viewport(&sample);
                Ok(())
            }
            SessionEvent::ReadyToPlay { tile, epoch } => self.on_ready(tile, epoch),
            SessionEvent::FetchFailed {
                tile,
                epoch,
                reason,
            } => self.on_fetch_failed(tile, epoch, &reason),
            SessionEvent::BaseReady { position, rate } => {
                self.on_base_ready(position, rate);
                Ok(())
            }
            SessionEvent::Select(tile) => self.select(tile),
            SessionEvent::Unselect(tile) => self.unselect(tile),
            SessionEvent::SetQuality { tile, level } => self.set_quality(tile, level).map(|_| ()),
            SessionEvent::StepQuality { tile, delta } => {
                self.step_quality(tile, delta).map(|_| ())
            }
        };

        if result.is_err() {
            self.stats.rejected_events += 1;
        }
        self.publish_status();
        result
    }

    /// Admission/eviction pass for one viewport sample.
    pub fn on_viewport(&mut self, sample: &ViewportSample) {
        let point = sample.point();
        let expected = self.predictor.predicted_point();
        self.predictor.observe(point);
        self.lookahead = if self.config.use_prediction {
            self.predictor.predicted_point()
        } else {
            None
        };

        self.stats.updates += 1;
        self.clock = Some(sample.timestamp);
        self.last_point = Some(point);
        self.trace.push(TraceEntry::new(
            self.stats.updates,
            point,
            expected,
            &self.predictor.stats(),
        ));

        let arena = Arc::clone(&self.arena);
        for tile in arena.iter() {
            let id = tile.id();
            let center = tile.center();
            let mut distance = point.distance_squared(&center);
            if let Some(ahead) = self.lookahead {
                distance = distance.min(ahead.distance_squared(&center));
            }

            let proximity = if self.pinned.contains(&id) {
                Proximity::Inside
            } else {
                self.policy.classify(distance)
            };

            match proximity {
                Proximity::Inside => {
                    self.outside_since[id.index()] = None;
                    self.admit(tile, distance, sample.timestamp);
                }
                Proximity::Band => {
                    self.outside_since[id.index()] = None;
                }
                Proximity::Outside => self.evict(tile, distance, sample.timestamp),
            }
        }

        trace!(
            point = %point,
            lookahead = ?self.lookahead,
            update = self.stats.updates,
            "Viewport update processed"
        );
    }

    fn admit(&mut self, tile: &TilePipeline, distance: f64, at: Instant) {
        let id = tile.id();
        match tile.state() {
            TileState::Active => return,
            TileState::Unloaded if !tile.retry_allowed(at, self.config.retry_cooldown) => {
                trace!(tile = %id, "Retry cooldown in effect");
                return;
            }
            _ => {}
        }
        if tile.activate_at(at) {
            self.stats.activations += 1;
            debug!(tile = %id, distance, "Tile admitted");
        }
    }

    fn evict(&mut self, tile: &TilePipeline, distance: f64, at: Instant) {
        let id = tile.id();
        if !matches!(tile.state(), TileState::Active | TileState::Loading) {
            self.outside_since[id.index()] = None;
            return;
        }

        let since = *self.outside_since[id.index()].get_or_insert(at);
        if at.saturating_duration_since(since) < self.config.dwell {
            trace!(tile = %id, "Eviction waiting for dwell");
            return;
        }

        if tile.deactivate() {
            self.stats.deactivations += 1;
            debug!(tile = %id, distance, "Tile evicted");
        }
        self.outside_since[id.index()] = None;
    }

    fn on_ready(&mut self, tile: TileId, epoch: u64) -> Result<(), EngineError> {
        if !self.arena.get(tile)?.on_ready(epoch) {
            self.stats.stale_callbacks += 1;
        }
        Ok(())
    }

    fn on_fetch_failed(&mut self, tile: TileId, epoch: u64, reason: &str) -> Result<(), EngineError> {
        let at = self.now();
        if self.arena.get(tile)?.on_fetch_failed(epoch, reason, at) {
            self.stats.fetch_failures += 1;
        } else {
            self.stats.stale_callbacks += 1;
        }
        Ok(())
    }

    /// Re-broadcast the base stream's position and re-anchor playing tiles.
    pub fn on_base_ready(&mut self, position: f64, rate: f64) {
        let tiles = self.sync.rebroadcast(position, rate);
        let reanchored = tiles
            .into_iter()
            .filter_map(|id| self.arena.get(id).ok())
            .filter(|tile| tile.reanchor())
            .count();
        debug!(position, rate, reanchored, "Base stream ready");
    }

    /// Activate a tile regardless of distance and keep it until unselected.
    pub fn select(&mut self, tile: TileId) -> Result<(), EngineError> {
        let pipeline = self.arena.get(tile)?;
        self.pinned.insert(tile);
        self.outside_since[tile.index()] = None;
        if pipeline.activate_at(self.now()) {
            self.stats.activations += 1;
        }
        info!(tile = %tile, state = %pipeline.state(), "Tile selected");
        Ok(())
    }

    /// Release a selection and unload the tile.
    pub fn unselect(&mut self, tile: TileId) -> Result<(), EngineError> {
        let pipeline = self.arena.get(tile)?;
        self.pinned.remove(&tile);
        if pipeline.teardown() {
            self.stats.teardowns += 1;
        }
        info!(tile = %tile, "Tile unselected");
        Ok(())
    }

    pub fn set_quality(&mut self, tile: TileId, level: usize) -> Result<bool, EngineError> {
        Ok(self.arena.get(tile)?.set_quality(level))
    }

    pub fn step_quality(&mut self, tile: TileId, delta: i32) -> Result<bool, EngineError> {
        Ok(self.arena.get(tile)?.step_quality(delta))
    }

    /// Tear down every tile and drop all selections.
    pub fn teardown_all(&mut self) {
        let released = self.arena.iter().filter(|t| t.teardown()).count();
        self.stats.teardowns += released as u64;
        self.pinned.clear();
        self.outside_since.iter_mut().for_each(|s| *s = None);
        debug!(released, "All tiles torn down");
        self.publish_status();
    }

    /// Snapshot of the scheduler's own state.
    pub fn status(&self) -> SchedulerStatusSnapshot {
        SchedulerStatusSnapshot {
            running: self.running,
            last_point: self.last_point,
            predicted_point: self.lookahead,
            stats: self.stats,
            pinned: self.pinned(),
            prediction: self.predictor.stats(),
            trace: self.trace.to_vec(),
        }
    }

    /// Sample clock, falling back to the wall clock before the first sample.
    fn now(&self) -> Instant {
        self.clock.unwrap_or_else(Instant::now)
    }

    fn publish_status(&self) {
        if let Some(ref status) = self.shared_status {
            status.publish(self.status());
        }
    }
}
