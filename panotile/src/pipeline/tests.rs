//! Tests for the tile lifecycle state machine

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;

use super::*;
use crate::coord::{NormalizedPoint, TileGrid, TileId};
use crate::error::EngineError;
use crate::media::testing::{MediaCall, RecordingMedia};
use crate::scheduler::{event_channel, SessionEvent};
use crate::sync::SyncCoordinator;

struct Fixture {
    media: Arc<RecordingMedia>,
    sync: Arc<SyncCoordinator>,
    rx: UnboundedReceiver<SessionEvent>,
    tile: TilePipeline,
}

fn fixture() -> Fixture {
    let media = Arc::new(RecordingMedia::new());
    let sync = Arc::new(SyncCoordinator::new());
    sync.seed(10.0);
    let (events, rx) = event_channel();
    let tile = TilePipeline::new(
        TileId(0),
        NormalizedPoint::new(0.25, 0.25),
        "tile-0.mpd",
        media.clone(),
        sync.clone(),
        events,
    );
    Fixture {
        media,
        sync,
        rx,
        tile,
    }
}

/// Deliver queued readiness events for this tile.
fn deliver(f: &mut Fixture) {
    f.media.ready_all();
    while let Ok(event) = f.rx.try_recv() {
        if let SessionEvent::ReadyToPlay { epoch, .. } = event {
            f.tile.on_ready(epoch);
        }
    }
}

#[test]
fn test_new_tile_is_unloaded() {
    let f = fixture();
    assert_eq!(f.tile.state(), TileState::Unloaded);
    assert_eq!(f.tile.metrics(), TileMetrics::default());
    assert!(f.tile.bitrate_ladder().is_empty());
}

#[test]
fn test_activate_walks_to_active() {
    let mut f = fixture();
    assert!(f.tile.activate());
    assert_eq!(f.tile.state(), TileState::Loading);
    assert_eq!(f.media.calls(), vec![MediaCall::Create("tile-0.mpd".into())]);

    deliver(&mut f);

    assert_eq!(f.tile.state(), TileState::Active);
    assert!(f.sync.is_registered(TileId(0)));
    let calls = f.media.calls();
    assert!(matches!(calls[1], MediaCall::Seek(_, pos) if pos >= 10.0));
    assert!(matches!(calls[2], MediaCall::Play(_)));
}

#[test]
fn test_activate_is_idempotent_when_active() {
    let mut f = fixture();
    f.tile.activate();
    deliver(&mut f);
    let before = f.media.calls().len();

    assert!(!f.tile.activate());
    assert!(!f.tile.activate());

    assert_eq!(f.media.calls().len(), before);
    assert_eq!(f.media.creates(), 1);
    assert_eq!(f.sync.registered(), vec![TileId(0)]);
}

#[test]
fn test_repeated_activate_while_loading_fetches_once() {
    let f = fixture();
    f.tile.activate();
    assert!(!f.tile.activate());
    assert_eq!(f.media.creates(), 1);
}

#[test]
fn test_deactivate_pauses_without_unloading() {
    let mut f = fixture();
    f.tile.activate();
    deliver(&mut f);

    assert!(f.tile.deactivate());
    assert_eq!(f.tile.state(), TileState::Paused);
    assert!(!f.sync.is_registered(TileId(0)));
    assert_eq!(f.media.count(|c| matches!(c, MediaCall::Reset(_))), 0);

    // Quick return resumes without a new fetch.
    assert!(f.tile.activate());
    assert_eq!(f.tile.state(), TileState::Active);
    assert_eq!(f.media.creates(), 1);
    assert_eq!(f.media.count(|c| matches!(c, MediaCall::Seek(..))), 2);
}

#[test]
fn test_deactivate_while_loading_lands_in_ready() {
    let mut f = fixture();
    f.tile.activate();
    assert!(f.tile.deactivate());
    deliver(&mut f);
    assert_eq!(f.tile.state(), TileState::Ready);
    assert!(!f.sync.is_registered(TileId(0)));
}

#[test]
fn test_teardown_before_ready_ignores_stale_callback() {
    let mut f = fixture();
    f.tile.activate();
    let stale = f.media.notifier(TileId(0)).unwrap();

    assert!(f.tile.teardown());
    assert_eq!(f.tile.state(), TileState::Unloaded);

    stale.ready();
    let event = f.rx.try_recv().unwrap();
    let SessionEvent::ReadyToPlay { epoch, .. } = event else {
        panic!("unexpected event {event:?}");
    };
    assert!(!f.tile.on_ready(epoch));
    assert_eq!(f.tile.state(), TileState::Unloaded);
}

#[test]
fn test_stale_callback_does_not_hijack_new_load() {
    let f = fixture();
    f.tile.activate();
    let first_epoch = f.tile.epoch();
    f.tile.teardown();
    f.tile.activate();

    assert!(!f.tile.on_ready(first_epoch));
    assert_eq!(f.tile.state(), TileState::Loading);
    assert!(f.tile.on_ready(f.tile.epoch()));
    assert_eq!(f.tile.state(), TileState::Active);
}

#[test]
fn test_teardown_releases_everything() {
    let mut f = fixture();
    f.tile.activate();
    deliver(&mut f);

    assert!(f.tile.teardown());
    assert_eq!(f.tile.state(), TileState::Unloaded);
    assert!(!f.sync.is_registered(TileId(0)));
    assert_eq!(f.media.count(|c| matches!(c, MediaCall::Reset(_))), 1);
    assert!(!f.tile.teardown());
}

#[test]
fn test_fetch_failure_returns_to_unloaded() {
    let f = fixture();
    f.tile.activate();
    let epoch = f.tile.epoch();

    assert!(f.tile.on_fetch_failed(epoch, "404", Instant::now()));
    assert_eq!(f.tile.state(), TileState::Unloaded);
    assert_eq!(f.tile.failures(), 1);
    assert_eq!(
        f.tile.last_error(),
        Some(
            EngineError::FetchFailed {
                tile: TileId(0),
                reason: "404".into()
            }
            .to_string()
        )
    );
    // Late readiness for the failed attempt is ignored.
    assert!(!f.tile.on_ready(epoch));
}

#[test]
fn test_create_error_stays_unloaded() {
    let f = fixture();
    f.media.set_fail_create(true);
    assert!(!f.tile.activate());
    assert_eq!(f.tile.state(), TileState::Unloaded);
    assert_eq!(f.tile.failures(), 1);
}

#[test]
fn test_retry_cooldown() {
    let f = fixture();
    let failed_at = Instant::now() + Duration::from_secs(300);
    f.tile.activate();
    f.tile.on_fetch_failed(f.tile.epoch(), "timeout", failed_at);

    assert!(f.tile.retry_allowed(failed_at, Duration::ZERO));
    assert!(!f.tile.retry_allowed(failed_at, Duration::from_secs(60)));
    assert!(f
        .tile
        .retry_allowed(failed_at + Duration::from_secs(61), Duration::from_secs(60)));
}

#[test]
fn test_create_error_stamped_with_given_time() {
    let f = fixture();
    f.media.set_fail_create(true);
    let at = Instant::now() + Duration::from_secs(300);
    assert!(!f.tile.activate_at(at));

    let cooldown = Duration::from_secs(1);
    assert!(!f.tile.retry_allowed(at + Duration::from_millis(500), cooldown));
    assert!(f.tile.retry_allowed(at + cooldown, cooldown));
}

#[test]
fn test_unseeded_timeline_defers_anchor() {
    let media = Arc::new(RecordingMedia::new());
    let sync = Arc::new(SyncCoordinator::new());
    let (events, _rx) = event_channel();
    let tile = TilePipeline::new(
        TileId(1),
        NormalizedPoint::new(0.25, 0.75),
        "tile-1.mpd",
        media.clone(),
        sync.clone(),
        events,
    );

    tile.activate();
    tile.on_ready(tile.epoch());
    assert_eq!(tile.state(), TileState::Active);
    assert_eq!(media.count(|c| matches!(c, MediaCall::Seek(..))), 0);

    sync.seed(3.0);
    assert!(tile.reanchor());
    assert_eq!(media.count(|c| matches!(c, MediaCall::Seek(..))), 1);
}

#[test]
fn test_set_quality_before_ready_is_noop() {
    let f = fixture();
    assert!(!f.tile.set_quality(2));
    f.tile.activate();
    assert!(!f.tile.set_quality(2));
    assert_eq!(
        f.media.count(|c| matches!(c, MediaCall::SetQuality(..))),
        0
    );
}

#[test]
fn test_step_quality_before_ready_is_noop() {
    let f = fixture();
    assert!(!f.tile.step_quality(1));
    f.tile.activate();
    assert!(!f.tile.step_quality(1));
    assert!(!f.tile.step_quality(-1));
    assert_eq!(f.tile.quality(), None);
    assert_eq!(
        f.media.count(|c| matches!(c, MediaCall::SetQuality(..))),
        0
    );
}

#[test]
fn test_quality_stepping_clamps_to_ladder() {
    let mut f = fixture();
    f.tile.activate();
    deliver(&mut f);

    assert!(!f.tile.step_quality(-1));
    assert!(f.tile.step_quality(1));
    assert_eq!(f.tile.quality(), Some(1));
    assert!(f.tile.step_quality(5));
    assert_eq!(f.tile.quality(), Some(2));
    assert!(!f.tile.step_quality(1));
    assert!(f.tile.set_quality(0));
    assert_eq!(f.tile.quality(), Some(0));
}

#[test]
fn test_metrics_fall_back_to_last_known() {
    let mut f = fixture();
    f.tile.activate();
    deliver(&mut f);

    let live = f.tile.metrics();
    assert_eq!(live.buffer_length, 4.0);
    assert_eq!(live.throughput, 800.0);
    assert_eq!(f.tile.bitrate_ladder().len(), 3);

    f.tile.teardown();
    assert_eq!(f.tile.metrics(), TileMetrics::default());
}

#[test]
fn test_arena_lookup_and_draw_list() {
    let media = Arc::new(RecordingMedia::new());
    let sync = Arc::new(SyncCoordinator::new());
    sync.seed(0.0);
    let (events, _rx) = event_channel();
    let grid = TileGrid::new(2, 2).unwrap();
    let urls: Vec<String> = (0..4).map(|i| format!("t{i}.mpd")).collect();
    let arena = TileArena::new(grid, &urls, media.clone(), sync, events);

    assert_eq!(arena.len(), 4);
    assert_eq!(arena.get(TileId(3)).unwrap().url(), "t3.mpd");
    assert_eq!(
        arena.get(TileId(4)).unwrap_err(),
        EngineError::UnknownTile {
            tile: TileId(4),
            tile_count: 4
        }
    );

    let tile = arena.get(TileId(2)).unwrap();
    tile.activate();
    tile.on_ready(tile.epoch());

    let drawable = arena.drawable();
    assert_eq!(drawable.len(), 1);
    // Tile 2 is row 0, col 1: left edge, lower half of the texture.
    assert_eq!(drawable[0].tile, 2);
    assert_eq!((drawable[0].x, drawable[0].y), (0.0, 0.5));
    assert_eq!(arena.in_state(TileState::Active), vec![TileId(2)]);
}

#[test]
fn test_draw_list_uses_texture_layout() {
    let media = Arc::new(RecordingMedia::new());
    let sync = Arc::new(SyncCoordinator::new());
    sync.seed(0.0);
    let (events, _rx) = event_channel();
    let grid = TileGrid::new(4, 3).unwrap();
    let urls: Vec<String> = (0..12).map(|i| format!("t{i}.mpd")).collect();
    let arena = TileArena::new(grid, &urls, media, sync, events);

    for id in [1, 4] {
        let tile = arena.get(TileId(id)).unwrap();
        tile.activate();
        tile.on_ready(tile.epoch());
    }

    let drawable = arena.drawable();
    assert_eq!(drawable.len(), 2);
    let close = |a: f64, b: f64| (a - b).abs() < 1e-9;

    // Tile 1 is row 1, col 0: second quarter across the top band.
    let r = drawable[0];
    assert_eq!(r.tile, 1);
    assert!(close(r.x, 0.25) && close(r.y, 0.0));
    assert!(close(r.width, 0.25) && close(r.height, 1.0 / 3.0));

    // Tile 4 is row 0, col 1: first quarter of the middle band.
    let r = drawable[1];
    assert_eq!(r.tile, 4);
    assert!(close(r.x, 0.0) && close(r.y, 1.0 / 3.0));
    assert!(close(r.width, 0.25) && close(r.height, 1.0 / 3.0));
}
