//! Shared playback timeline.
//!
//! The [`SyncCoordinator`] owns the one canonical position/rate of a session,
//! seeded from the base stream. Pipelines read it to anchor their local clock
//! when they start or resume playback, and register while they are playing so
//! the coordinator knows which tiles to re-anchor when the base stream
//! re-broadcasts its position. Only the coordinator writes the timeline.
//!
//! Anchoring is a single position/rate broadcast; there is no continuous
//! drift correction here.

use std::collections::BTreeSet;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::coord::TileId;
use crate::error::EngineError;

/// Position and rate of the shared timeline at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineState {
    /// Seconds into the media at `updated_at`.
    pub position: f64,
    /// Playback rate (1.0 is real time).
    pub rate: f64,
    pub updated_at: Instant,
}

impl TimelineState {
    /// Extrapolated position at `now`.
    pub fn position_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.updated_at).as_secs_f64();
        self.position + self.rate * elapsed
    }
}

/// Owner of the session's shared timeline and the set of synced tiles.
#[derive(Debug)]
pub struct SyncCoordinator {
    timeline: watch::Sender<Option<TimelineState>>,
    registered: Mutex<BTreeSet<TileId>>,
}

impl SyncCoordinator {
    /// Create an unseeded coordinator.
    pub fn new() -> Self {
        let (timeline, _) = watch::channel(None);
        Self {
            timeline,
            registered: Mutex::new(BTreeSet::new()),
        }
    }

    /// Seed the timeline from the base stream's position at real-time rate.
    pub fn seed(&self, position: f64) {
        info!(position, "Shared timeline seeded");
        self.publish(position, 1.0);
    }

    /// Re-broadcast the base stream's position and rate.
    ///
    /// Returns the currently registered tiles, which should re-anchor.
    pub fn rebroadcast(&self, position: f64, rate: f64) -> Vec<TileId> {
        let seeded = self.is_seeded();
        self.publish(position, rate);
        let tiles = self.registered();
        debug!(
            position,
            rate,
            first_seed = !seeded,
            registered = tiles.len(),
            "Shared timeline re-broadcast"
        );
        tiles
    }

    fn publish(&self, position: f64, rate: f64) {
        self.timeline.send_replace(Some(TimelineState {
            position,
            rate,
            updated_at: Instant::now(),
        }));
    }

    pub fn is_seeded(&self) -> bool {
        self.timeline.borrow().is_some()
    }

    pub fn timeline(&self) -> Option<TimelineState> {
        *self.timeline.borrow()
    }

    /// Current extrapolated position, if seeded.
    pub fn current_position(&self) -> Option<f64> {
        self.timeline().map(|t| t.position_at(Instant::now()))
    }

    /// Position a tile should seek to before playing.
    pub fn anchor(&self, tile: TileId) -> Result<f64, EngineError> {
        self.current_position()
            .ok_or(EngineError::SyncAnchorMissing { tile })
    }

    /// Watch timeline updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<TimelineState>> {
        self.timeline.subscribe()
    }

    /// Register a playing tile. Returns `false` if it was already registered.
    pub fn register(&self, tile: TileId) -> bool {
        self.registered.lock().insert(tile)
    }

    /// Unregister a tile. Returns `false` if it was not registered.
    pub fn unregister(&self, tile: TileId) -> bool {
        self.registered.lock().remove(&tile)
    }

    pub fn is_registered(&self, tile: TileId) -> bool {
        self.registered.lock().contains(&tile)
    }

    /// Registered tiles in id order.
    pub fn registered(&self) -> Vec<TileId> {
        self.registered.lock().iter().copied().collect()
    }
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_anchor_before_seed_is_missing() {
        let sync = SyncCoordinator::new();
        assert!(!sync.is_seeded());
        assert_eq!(
            sync.anchor(TileId(2)),
            Err(EngineError::SyncAnchorMissing { tile: TileId(2) })
        );
    }

    #[test]
    fn test_seed_uses_real_time_rate() {
        let sync = SyncCoordinator::new();
        sync.seed(42.0);
        let timeline = sync.timeline().unwrap();
        assert_eq!(timeline.rate, 1.0);
        assert!(sync.anchor(TileId(0)).unwrap() >= 42.0);
    }

    #[test]
    fn test_position_extrapolates_with_rate() {
        let base = Instant::now();
        let state = TimelineState {
            position: 10.0,
            rate: 2.0,
            updated_at: base,
        };
        let pos = state.position_at(base + Duration::from_millis(500));
        assert!((pos - 11.0).abs() < 1e-9);
        // Earlier instants never move the clock backwards.
        assert_eq!(state.position_at(base - Duration::from_secs(1)), 10.0);
    }

    #[test]
    fn test_registration_is_idempotent() {
        let sync = SyncCoordinator::new();
        assert!(sync.register(TileId(1)));
        assert!(!sync.register(TileId(1)));
        assert_eq!(sync.registered(), vec![TileId(1)]);
        assert!(sync.unregister(TileId(1)));
        assert!(!sync.unregister(TileId(1)));
        assert!(!sync.is_registered(TileId(1)));
    }

    #[test]
    fn test_rebroadcast_returns_registered_tiles() {
        let sync = SyncCoordinator::new();
        sync.register(TileId(3));
        sync.register(TileId(0));
        let tiles = sync.rebroadcast(5.0, 1.0);
        assert_eq!(tiles, vec![TileId(0), TileId(3)]);
        assert!(sync.is_seeded());
    }

    #[test]
    fn test_subscribers_see_updates() {
        let sync = SyncCoordinator::new();
        let mut rx = sync.subscribe();
        sync.seed(1.0);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().unwrap().position, 1.0);
    }
}
