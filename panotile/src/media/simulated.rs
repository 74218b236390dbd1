//! In-process simulated media collaborators.
//!
//! `SimulatedMedia` stands in for a real adaptive-bitrate player: each created
//! player reports readiness after a fixed startup latency (or a fetch failure
//! when its URL matches a configured pattern), fills its buffer at a constant
//! rate while playing, and reports throughput derived from the selected rung
//! of its bitrate ladder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, trace};

use super::{BaseStream, Bitrate, MediaBackend, MediaError, MediaHandle, ReadinessNotifier};

/// Seconds of media buffered per wall-clock second while playing.
const FILL_RATE: f64 = 2.0;

/// Buffer target; the simulated player stops filling here.
const MAX_BUFFER_SECS: f64 = 30.0;

/// Throughput reported relative to the selected bitrate.
const THROUGHPUT_HEADROOM: f64 = 1.25;

#[derive(Debug)]
struct SimulatedPlayer {
    url: String,
    ready: bool,
    playing: bool,
    position: f64,
    quality: usize,
    buffered: f64,
    resumed_at: Option<Instant>,
}

impl SimulatedPlayer {
    fn buffer_now(&self) -> f64 {
        let growing = self
            .resumed_at
            .map(|t| t.elapsed().as_secs_f64() * FILL_RATE)
            .unwrap_or(0.0);
        (self.buffered + growing).min(MAX_BUFFER_SECS)
    }
}

/// Simulated per-tile players.
pub struct SimulatedMedia {
    runtime: Handle,
    startup_latency: Duration,
    failing: Vec<String>,
    ladder: Vec<Bitrate>,
    next_handle: AtomicU64,
    players: Arc<Mutex<HashMap<MediaHandle, SimulatedPlayer>>>,
}

impl SimulatedMedia {
    /// Create a backend that spawns its load tasks on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            startup_latency: Duration::from_millis(50),
            failing: Vec::new(),
            ladder: default_ladder(),
            next_handle: AtomicU64::new(1),
            players: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_startup_latency(mut self, latency: Duration) -> Self {
        self.startup_latency = latency;
        self
    }

    /// Fail every load whose URL contains `pattern`.
    pub fn with_failing_url(mut self, pattern: impl Into<String>) -> Self {
        self.failing.push(pattern.into());
        self
    }

    pub fn with_ladder(mut self, ladder: Vec<Bitrate>) -> Self {
        self.ladder = ladder;
        self
    }

    /// Players currently allocated (created and not reset).
    pub fn live_players(&self) -> usize {
        self.players.lock().len()
    }

    /// URLs of players currently playing.
    pub fn playing_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .players
            .lock()
            .values()
            .filter(|p| p.playing)
            .map(|p| p.url.clone())
            .collect();
        urls.sort();
        urls
    }

    fn with_player<R>(
        &self,
        handle: MediaHandle,
        f: impl FnOnce(&mut SimulatedPlayer) -> R,
    ) -> Result<R, MediaError> {
        let mut players = self.players.lock();
        players
            .get_mut(&handle)
            .map(f)
            .ok_or(MediaError::UnknownHandle(handle))
    }
}

impl MediaBackend for SimulatedMedia {
    fn create(&self, url: &str, notifier: ReadinessNotifier) -> Result<MediaHandle, MediaError> {
        if url.is_empty() {
            return Err(MediaError::CreateFailed {
                url: url.to_string(),
                reason: "empty url".to_string(),
            });
        }

        let handle = MediaHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.players.lock().insert(
            handle,
            SimulatedPlayer {
                url: url.to_string(),
                ready: false,
                playing: false,
                position: 0.0,
                quality: 0,
                buffered: 0.0,
                resumed_at: None,
            },
        );

        let fails = self.failing.iter().any(|pattern| url.contains(pattern));
        let latency = self.startup_latency;
        let players = Arc::clone(&self.players);
        debug!(%handle, url, fails, "Simulated player created");

        self.runtime.spawn(async move {
            tokio::time::sleep(latency).await;
            if fails {
                players.lock().remove(&handle);
                notifier.failed("simulated fetch failure");
                return;
            }
            if let Some(player) = players.lock().get_mut(&handle) {
                player.ready = true;
            }
            // Reported even if the player was reset meanwhile; the receiver
            // decides whether the callback is stale.
            notifier.ready();
        });

        Ok(handle)
    }

    fn seek(&self, handle: MediaHandle, position: f64) -> Result<(), MediaError> {
        self.with_player(handle, |p| {
            trace!(%handle, position, "Simulated seek");
            p.position = position;
        })
    }

    fn play(&self, handle: MediaHandle) -> Result<(), MediaError> {
        self.with_player(handle, |p| {
            if !p.playing {
                p.playing = true;
                p.resumed_at = Some(Instant::now());
            }
        })
    }

    fn pause(&self, handle: MediaHandle) -> Result<(), MediaError> {
        self.with_player(handle, |p| {
            p.buffered = p.buffer_now();
            p.playing = false;
            p.resumed_at = None;
        })
    }

    fn reset(&self, handle: MediaHandle) -> Result<(), MediaError> {
        self.players
            .lock()
            .remove(&handle)
            .map(|_| ())
            .ok_or(MediaError::UnknownHandle(handle))
    }

    fn set_quality(&self, handle: MediaHandle, level: usize) -> Result<(), MediaError> {
        let top = self.ladder.len().saturating_sub(1);
        self.with_player(handle, |p| p.quality = level.min(top))
    }

    fn quality(&self, handle: MediaHandle) -> Option<usize> {
        self.players.lock().get(&handle).map(|p| p.quality)
    }

    fn buffer_length(&self, handle: MediaHandle) -> Option<f64> {
        self.players.lock().get(&handle).map(|p| p.buffer_now())
    }

    fn throughput(&self, handle: MediaHandle) -> Option<f64> {
        let players = self.players.lock();
        let player = players.get(&handle)?;
        if !player.ready {
            return Some(0.0);
        }
        let rung = self.ladder.get(player.quality)?;
        Some(rung.bitrate as f64 / 1000.0 * THROUGHPUT_HEADROOM)
    }

    fn bitrate_ladder(&self, handle: MediaHandle) -> Vec<Bitrate> {
        if self.players.lock().contains_key(&handle) {
            self.ladder.clone()
        } else {
            Vec::new()
        }
    }
}

/// Three-rung ladder for 2:1 equirectangular tiles.
pub fn default_ladder() -> Vec<Bitrate> {
    vec![
        Bitrate {
            bitrate: 500_000,
            width: 640,
            height: 320,
        },
        Bitrate {
            bitrate: 1_500_000,
            width: 1280,
            height: 640,
        },
        Bitrate {
            bitrate: 4_000_000,
            width: 1920,
            height: 960,
        },
    ]
}

/// Base stream that plays from a fixed start position in real time.
#[derive(Debug)]
pub struct SimulatedBaseStream {
    start_position: f64,
    started_at: Instant,
}

impl SimulatedBaseStream {
    pub fn new(start_position: f64) -> Self {
        Self {
            start_position,
            started_at: Instant::now(),
        }
    }
}

impl BaseStream for SimulatedBaseStream {
    fn current_time(&self) -> Option<f64> {
        Some(self.start_position + self.started_at.elapsed().as_secs_f64())
    }

    fn buffer_length(&self) -> f64 {
        (self.started_at.elapsed().as_secs_f64() * FILL_RATE).min(MAX_BUFFER_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileId;
    use crate::scheduler::{event_channel, SessionEvent};

    #[tokio::test]
    async fn test_create_reports_ready_after_latency() {
        let (sender, mut rx) = event_channel();
        let media = SimulatedMedia::new(Handle::current())
            .with_startup_latency(Duration::from_millis(5));

        let handle = media
            .create("tile-0.mpd", ReadinessNotifier::new(sender, TileId(0), 1))
            .unwrap();
        assert_eq!(media.throughput(handle), Some(0.0));

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            SessionEvent::ReadyToPlay {
                tile: TileId(0),
                epoch: 1
            }
        );
        assert_eq!(media.throughput(handle), Some(500_000.0 / 1000.0 * 1.25));
    }

    #[tokio::test]
    async fn test_failing_url_reports_fetch_failed() {
        let (sender, mut rx) = event_channel();
        let media = SimulatedMedia::new(Handle::current())
            .with_startup_latency(Duration::from_millis(1))
            .with_failing_url("broken");

        media
            .create("broken-3.mpd", ReadinessNotifier::new(sender, TileId(3), 1))
            .unwrap();

        match rx.recv().await.unwrap() {
            SessionEvent::FetchFailed { tile, .. } => assert_eq!(tile, TileId(3)),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(media.live_players(), 0);
    }

    #[tokio::test]
    async fn test_quality_clamped_to_ladder() {
        let (sender, _rx) = event_channel();
        let media = SimulatedMedia::new(Handle::current());
        let handle = media
            .create("t.mpd", ReadinessNotifier::new(sender, TileId(0), 1))
            .unwrap();

        media.set_quality(handle, 10).unwrap();
        assert_eq!(media.quality(handle), Some(2));
        assert_eq!(media.bitrate_ladder(handle).len(), 3);
    }

    #[tokio::test]
    async fn test_reset_releases_player() {
        let (sender, _rx) = event_channel();
        let media = SimulatedMedia::new(Handle::current());
        let handle = media
            .create("t.mpd", ReadinessNotifier::new(sender, TileId(0), 1))
            .unwrap();

        media.reset(handle).unwrap();
        assert_eq!(media.live_players(), 0);
        assert_eq!(media.reset(handle), Err(MediaError::UnknownHandle(handle)));
        assert!(media.bitrate_ladder(handle).is_empty());
        assert_eq!(media.buffer_length(handle), None);
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let (sender, _rx) = event_channel();
        let media = SimulatedMedia::new(Handle::current());
        let result = media.create("", ReadinessNotifier::new(sender, TileId(0), 1));
        assert!(matches!(result, Err(MediaError::CreateFailed { .. })));
    }

    #[test]
    fn test_base_stream_has_position() {
        let base = SimulatedBaseStream::new(12.0);
        assert!(base.current_time().unwrap() >= 12.0);
        assert!(base.buffer_length() >= 0.0);
    }
}
