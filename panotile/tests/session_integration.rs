//! Integration tests for playback sessions.
//!
//! These tests drive a complete session through its public API with the
//! simulated media backend:
//! - Viewport sweeps (admission, eviction, drawable regions)
//! - Readiness arriving after the viewer has moved on
//! - Quality commands and metrics publication
//! - Shutdown releasing every player
//!
//! Run with: `cargo test --test session_integration`

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;

use panotile::coord::TileId;
use panotile::manifest::Manifest;
use panotile::media::{SimulatedBaseStream, SimulatedMedia, TelemetrySink};
use panotile::metrics::{MetricsConfig, MetricsSnapshot};
use panotile::pipeline::TileState;
use panotile::session::{Collaborators, PlaybackSession, SessionConfig};

// ============================================================================
// Helpers
// ============================================================================

/// Sink that keeps every published snapshot.
#[derive(Default)]
struct CollectingSink {
    snapshots: Mutex<Vec<MetricsSnapshot>>,
}

impl TelemetrySink for CollectingSink {
    fn publish(&self, snapshot: &MetricsSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}

/// 4 rows by 3 columns, one URL per tile.
fn manifest() -> Manifest {
    let urls = (0..12).map(|i| format!("tile-{i}.mpd")).collect();
    Manifest::new("base.mpd", urls, 4, 3).unwrap()
}

fn start(
    media: &Arc<SimulatedMedia>,
    config: SessionConfig,
    telemetry: Option<Arc<dyn TelemetrySink>>,
) -> PlaybackSession {
    PlaybackSession::start(
        manifest(),
        config,
        Collaborators {
            media: media.clone(),
            base: Arc::new(SimulatedBaseStream::new(0.0)),
            telemetry,
        },
        &Handle::current(),
    )
    .unwrap()
}

/// Post a sample whose viewport point is `(x, y)`.
fn look_at(session: &PlaybackSession, x: f64, y: f64) {
    session.push_viewport(180.0 - 180.0 * x, 360.0 * y - 180.0);
}

fn active(session: &PlaybackSession) -> Vec<usize> {
    session
        .tile_statuses()
        .into_iter()
        .filter(|t| t.state == TileState::Active)
        .map(|t| t.id)
        .collect()
}

async fn wait(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_sweep_moves_active_set() {
    let media = Arc::new(SimulatedMedia::new(Handle::current()));
    let session = start(&media, SessionConfig::default(), None);

    // center of tile 5 (row 1, col 1); its vertical neighbours are in range
    look_at(&session, 0.5, 0.375);
    wait(100).await;
    assert_eq!(active(&session), vec![4, 5, 6]);

    // center of tile 11 (row 3, col 2)
    look_at(&session, 5.0 / 6.0, 0.875);
    wait(100).await;
    assert_eq!(active(&session), vec![10, 11]);

    for id in [4, 5, 6] {
        assert_eq!(
            session.tile_status(TileId(id)).unwrap().state,
            TileState::Paused
        );
    }
    assert_eq!(media.playing_urls(), vec!["tile-10.mpd", "tile-11.mpd"]);

    let drawable: Vec<usize> = session.drawable_tiles().iter().map(|r| r.tile).collect();
    assert_eq!(drawable, vec![10, 11]);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_ready_after_leaving_does_not_play() {
    let media = Arc::new(
        SimulatedMedia::new(Handle::current()).with_startup_latency(Duration::from_millis(200)),
    );
    let session = start(&media, SessionConfig::default(), None);

    look_at(&session, 1.0 / 6.0, 0.125);
    wait(10).await;
    assert_eq!(
        session.tile_status(TileId(0)).unwrap().state,
        TileState::Loading
    );

    // leave before the player is ready
    look_at(&session, 5.0 / 6.0, 0.875);
    wait(300).await;

    assert_eq!(session.tile_status(TileId(0)).unwrap().state, TileState::Ready);
    assert!(!media.playing_urls().contains(&"tile-0.mpd".to_string()));
    assert!(active(&session).contains(&11));

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_quality_steps_clamp_to_ladder() {
    let media = Arc::new(SimulatedMedia::new(Handle::current()));
    let session = start(&media, SessionConfig::default(), None);

    session.select(TileId(7)).unwrap();
    wait(100).await;
    let status = session.tile_status(TileId(7)).unwrap();
    assert!(status.pinned);
    assert_eq!(status.state, TileState::Active);
    assert_eq!(status.bitrate_ladder.len(), 3);

    session.step_quality(TileId(7), 1).unwrap();
    wait(10).await;
    assert_eq!(session.tile_status(TileId(7)).unwrap().quality, Some(1));

    session.step_quality(TileId(7), 5).unwrap();
    wait(10).await;
    assert_eq!(session.tile_status(TileId(7)).unwrap().quality, Some(2));

    session.set_quality(TileId(7), 0).unwrap();
    wait(10).await;
    assert_eq!(session.tile_status(TileId(7)).unwrap().quality, Some(0));

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_metrics_published_on_interval() {
    let media = Arc::new(SimulatedMedia::new(Handle::current()));
    let sink = Arc::new(CollectingSink::default());
    let config = SessionConfig {
        metrics: MetricsConfig {
            interval: Duration::from_millis(500),
        },
        ..SessionConfig::default()
    };
    let session = start(&media, config, Some(sink.clone()));

    look_at(&session, 0.5, 0.375);
    wait(1200).await;
    session.shutdown().await;

    let snapshots = sink.snapshots.lock().unwrap();
    // ticks at 0, 500 and 1000 ms plus the final snapshot on shutdown
    assert_eq!(snapshots.len(), 4);
    assert!(snapshots.iter().all(|s| s.tiles.len() == 12));
    assert!(snapshots.iter().all(|s| s.buffer_lengths().len() == 13));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_players() {
    let media = Arc::new(SimulatedMedia::new(Handle::current()));
    let session = start(&media, SessionConfig::default(), None);

    look_at(&session, 0.5, 0.375);
    wait(100).await;
    assert_eq!(media.live_players(), 3);

    session.shutdown().await;
    assert_eq!(media.live_players(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_tile_rejected_synchronously() {
    let media = Arc::new(SimulatedMedia::new(Handle::current()));
    let session = start(&media, SessionConfig::default(), None);

    assert!(session.select(TileId(12)).is_err());
    assert!(session.tile_status(TileId(99)).is_err());

    session.shutdown().await;
}
