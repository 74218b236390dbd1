//! Recording media backend for unit tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{
    default_ladder, BaseStream, Bitrate, MediaBackend, MediaError, MediaHandle, ReadinessNotifier,
};
use crate::coord::TileId;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MediaCall {
    Create(String),
    Seek(MediaHandle, f64),
    Play(MediaHandle),
    Pause(MediaHandle),
    Reset(MediaHandle),
    SetQuality(MediaHandle, usize),
}

/// Backend that records every call and never reports readiness on its own.
///
/// Tests deliver readiness explicitly through the stored notifiers.
pub(crate) struct RecordingMedia {
    calls: Mutex<Vec<MediaCall>>,
    notifiers: Mutex<Vec<ReadinessNotifier>>,
    qualities: Mutex<Vec<(MediaHandle, usize)>>,
    next: AtomicU64,
    fail_create: AtomicBool,
    ladder: Vec<Bitrate>,
}

impl RecordingMedia {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            notifiers: Mutex::new(Vec::new()),
            qualities: Mutex::new(Vec::new()),
            next: AtomicU64::new(1),
            fail_create: AtomicBool::new(false),
            ladder: default_ladder(),
        }
    }

    pub(crate) fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<MediaCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&MediaCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn creates(&self) -> usize {
        self.count(|c| matches!(c, MediaCall::Create(_)))
    }

    /// Most recent notifier handed out for `tile`.
    pub(crate) fn notifier(&self, tile: TileId) -> Option<ReadinessNotifier> {
        self.notifiers
            .lock()
            .iter()
            .rev()
            .find(|n| n.tile() == tile)
            .cloned()
    }

    /// Report readiness for every outstanding load.
    pub(crate) fn ready_all(&self) {
        for notifier in self.notifiers.lock().drain(..) {
            notifier.ready();
        }
    }

    fn record(&self, call: MediaCall) {
        self.calls.lock().push(call);
    }
}

impl MediaBackend for RecordingMedia {
    fn create(&self, url: &str, notifier: ReadinessNotifier) -> Result<MediaHandle, MediaError> {
        self.record(MediaCall::Create(url.to_string()));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(MediaError::CreateFailed {
                url: url.to_string(),
                reason: "refused".to_string(),
            });
        }
        self.notifiers.lock().push(notifier);
        Ok(MediaHandle(self.next.fetch_add(1, Ordering::SeqCst)))
    }

    fn seek(&self, handle: MediaHandle, position: f64) -> Result<(), MediaError> {
        self.record(MediaCall::Seek(handle, position));
        Ok(())
    }

    fn play(&self, handle: MediaHandle) -> Result<(), MediaError> {
        self.record(MediaCall::Play(handle));
        Ok(())
    }

    fn pause(&self, handle: MediaHandle) -> Result<(), MediaError> {
        self.record(MediaCall::Pause(handle));
        Ok(())
    }

    fn reset(&self, handle: MediaHandle) -> Result<(), MediaError> {
        self.record(MediaCall::Reset(handle));
        Ok(())
    }

    fn set_quality(&self, handle: MediaHandle, level: usize) -> Result<(), MediaError> {
        self.record(MediaCall::SetQuality(handle, level));
        let mut qualities = self.qualities.lock();
        qualities.retain(|(h, _)| *h != handle);
        qualities.push((handle, level));
        Ok(())
    }

    fn quality(&self, handle: MediaHandle) -> Option<usize> {
        Some(
            self.qualities
                .lock()
                .iter()
                .find(|(h, _)| *h == handle)
                .map(|(_, q)| *q)
                .unwrap_or(0),
        )
    }

    fn buffer_length(&self, _handle: MediaHandle) -> Option<f64> {
        Some(4.0)
    }

    fn throughput(&self, _handle: MediaHandle) -> Option<f64> {
        Some(800.0)
    }

    fn bitrate_ladder(&self, _handle: MediaHandle) -> Vec<Bitrate> {
        self.ladder.clone()
    }
}

/// Base stream with a settable position.
pub(crate) struct FixedBase {
    pub(crate) position: Mutex<Option<f64>>,
}

impl FixedBase {
    pub(crate) fn new(position: Option<f64>) -> Self {
        Self {
            position: Mutex::new(position),
        }
    }
}

impl BaseStream for FixedBase {
    fn current_time(&self) -> Option<f64> {
        *self.position.lock()
    }

    fn buffer_length(&self) -> f64 {
        7.5
    }
}
