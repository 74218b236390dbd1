//! Playback session.
//!
//! [`PlaybackSession`] owns everything one panoramic playback needs: the tile
//! arena, the timeline coordinator, the scheduling loop and the optional
//! metrics poller. UI code talks to it; media collaborators talk to the
//! scheduling loop through the [`EventSender`] it hands out.
//!
//! # Lifecycle
//!
//! 1. **Start**: [`PlaybackSession::start`] validates the manifest, builds the
//!    arena and spawns the background tasks on the given runtime
//! 2. **Operation**: viewport samples and UI commands are posted as events;
//!    status and metrics are read without touching the loop
//! 3. **Shutdown**: [`PlaybackSession::shutdown`] cancels the tasks, which
//!    tear down every tile before exiting

mod config;
mod error;

pub use config::SessionConfig;
pub use error::SessionError;

use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::coord::{TileGrid, TileId};
use crate::error::EngineError;
use crate::manifest::Manifest;
use crate::media::{BaseStream, Bitrate, MediaBackend, TelemetrySink};
use crate::metrics::{MetricsAggregator, MetricsPoller, MetricsSnapshot};
use crate::pipeline::{DrawRegion, TileArena, TilePipeline, TileState};
use crate::scheduler::{
    event_channel, EventSender, SchedulerStatusSnapshot, SharedSchedulerStatus, TileScheduler,
};
use crate::sync::{SyncCoordinator, TimelineState};
use crate::viewport::ViewportSample;

/// External components a session drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Creates and controls one player per tile.
    pub media: Arc<dyn MediaBackend>,
    /// The always-on base stream.
    pub base: Arc<dyn BaseStream>,
    /// Receives periodic metrics snapshots; no poller runs without one.
    pub telemetry: Option<Arc<dyn TelemetrySink>>,
}

/// Per-tile view for UIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileStatus {
    pub id: usize,
    pub state: TileState,
    /// Manually selected and exempt from eviction.
    pub pinned: bool,
    pub quality: Option<usize>,
    pub buffer_length: f64,
    /// kbit/s
    pub throughput: f64,
    pub bitrate_ladder: Vec<Bitrate>,
    pub failures: u32,
    pub last_error: Option<String>,
}

/// A running playback session.
pub struct PlaybackSession {
    manifest: Manifest,
    arena: Arc<TileArena>,
    sync: Arc<SyncCoordinator>,
    events: EventSender,
    aggregator: MetricsAggregator,
    status: Arc<SharedSchedulerStatus>,
    shutdown_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Validate `manifest` and start the session's background tasks on
    /// `runtime`.
    ///
    /// The timeline is seeded from the base stream when it already reports a
    /// position; otherwise tiles wait for the first base-ready event before
    /// anchoring.
    pub fn start(
        manifest: Manifest,
        config: SessionConfig,
        collaborators: Collaborators,
        runtime: &Handle,
    ) -> Result<Self, SessionError> {
        manifest.validate()?;
        let grid = manifest.grid()?;

        info!(
            rows = grid.rows(),
            cols = grid.cols(),
            base = %manifest.base_stream_url,
            "Starting playback session"
        );

        let sync = Arc::new(SyncCoordinator::new());
        match collaborators.base.current_time() {
            Some(position) => sync.seed(position),
            None => debug!("Base stream has no position yet, timeline unseeded"),
        }

        let (events, rx) = event_channel();
        let arena = Arc::new(TileArena::new(
            grid,
            &manifest.tile_urls,
            Arc::clone(&collaborators.media),
            Arc::clone(&sync),
            events.clone(),
        ));

        let status = SharedSchedulerStatus::new();
        let scheduler = TileScheduler::new(
            Arc::clone(&arena),
            Arc::clone(&sync),
            config.scheduler,
            config.predictor,
            config.trace_capacity,
        )
        .with_shared_status(Arc::clone(&status));

        let shutdown_token = CancellationToken::new();
        let mut tasks = Vec::with_capacity(2);
        tasks.push(runtime.spawn(scheduler.run(rx, shutdown_token.clone())));

        let aggregator = MetricsAggregator::new(Arc::clone(&arena), collaborators.base);
        if let Some(sink) = collaborators.telemetry {
            let poller = MetricsPoller::new(aggregator.clone(), sink, config.metrics);
            tasks.push(runtime.spawn(poller.run(shutdown_token.clone())));
        }

        info!(tiles = arena.len(), "Playback session started");

        Ok(Self {
            manifest,
            arena,
            sync,
            events,
            aggregator,
            status,
            shutdown_token,
            tasks,
        })
    }

    /// Sender for media collaborators and other event producers.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn grid(&self) -> &TileGrid {
        self.arena.grid()
    }

    /// Post an orientation sample taken now.
    pub fn push_viewport(&self, latitude: f64, longitude: f64) {
        self.events.viewport(ViewportSample::new(latitude, longitude));
    }

    /// Post an orientation sample with its own timestamp.
    pub fn push_sample(&self, sample: ViewportSample) {
        self.events.viewport(sample);
    }

    /// Report that the base stream can play at `position` seconds.
    pub fn base_ready(&self, position: f64, rate: f64) {
        self.events.base_ready(position, rate);
    }

    /// Activate and pin a tile.
    pub fn select(&self, tile: TileId) -> Result<(), EngineError> {
        self.arena.get(tile)?;
        self.events.select(tile);
        Ok(())
    }

    /// Unpin and unload a tile.
    pub fn unselect(&self, tile: TileId) -> Result<(), EngineError> {
        self.arena.get(tile)?;
        self.events.unselect(tile);
        Ok(())
    }

    pub fn set_quality(&self, tile: TileId, level: usize) -> Result<(), EngineError> {
        self.arena.get(tile)?;
        self.events.set_quality(tile, level);
        Ok(())
    }

    /// Move a tile `delta` steps along its bitrate ladder.
    pub fn step_quality(&self, tile: TileId, delta: i32) -> Result<(), EngineError> {
        self.arena.get(tile)?;
        self.events.step_quality(tile, delta);
        Ok(())
    }

    /// Fresh metrics snapshot, independent of the poller cadence.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.aggregator.snapshot()
    }

    pub fn tile_status(&self, tile: TileId) -> Result<TileStatus, EngineError> {
        let pinned = self.status.pinned();
        let pipeline = self.arena.get(tile)?;
        Ok(Self::describe(pipeline, pinned.contains(&tile)))
    }

    /// Status of every tile, by id.
    pub fn tile_statuses(&self) -> Vec<TileStatus> {
        let pinned = self.status.pinned();
        self.arena
            .iter()
            .map(|pipeline| Self::describe(pipeline, pinned.contains(&pipeline.id())))
            .collect()
    }

    /// Tiles the compositor should draw over the base stream.
    pub fn drawable_tiles(&self) -> Vec<DrawRegion> {
        self.arena.drawable()
    }

    /// Latest status published by the scheduling loop.
    pub fn scheduler_status(&self) -> SchedulerStatusSnapshot {
        self.status.snapshot()
    }

    pub fn timeline(&self) -> Option<TimelineState> {
        self.sync.timeline()
    }

    /// Whether the scheduling loop is still processing events.
    pub fn is_running(&self) -> bool {
        !self.shutdown_token.is_cancelled() && !self.events.is_closed()
    }

    /// Stop the background tasks and wait for them to finish.
    ///
    /// Every tile is torn down before this returns.
    pub async fn shutdown(mut self) {
        info!("Shutting down playback session");
        self.shutdown_token.cancel();

        for handle in std::mem::take(&mut self.tasks) {
            if let Err(e) = handle.await {
                error!("Session task panicked: {}", e);
            }
        }

        info!("Playback session stopped");
    }

    fn describe(pipeline: &TilePipeline, pinned: bool) -> TileStatus {
        let metrics = pipeline.metrics();
        TileStatus {
            id: pipeline.id().index(),
            state: pipeline.state(),
            pinned,
            quality: metrics.quality,
            buffer_length: metrics.buffer_length,
            throughput: metrics.throughput,
            bitrate_ladder: pipeline.bitrate_ladder(),
            failures: pipeline.failures(),
            last_error: pipeline.last_error(),
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("tiles", &self.arena.len())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
