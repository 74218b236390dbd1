//! Bounded trajectory history.
//!
//! Keeps the most recent viewport points alongside the prediction that was in
//! effect when each arrived, for diagnostics and replay reports.

use std::collections::VecDeque;

use serde::Serialize;

use super::PredictionStats;
use crate::coord::NormalizedPoint;

/// Entries kept by default.
pub const DEFAULT_TRACE_CAPACITY: usize = 100;

/// Fixed-capacity FIFO that drops its oldest value when full.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// A capacity of zero keeps nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(value);
    }

    /// Most recently pushed value.
    pub fn last(&self) -> Option<&T> {
        self.data.back()
    }

    /// Values from oldest to newest.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// One recorded viewport step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraceEntry {
    /// Monotonic sample counter for the session.
    pub step: u64,
    pub x: f64,
    pub y: f64,
    /// Predicted point for this step, if a forecast existed.
    pub predicted_x: Option<f64>,
    pub predicted_y: Option<f64>,
    /// Running mean absolute error after this step.
    pub mae_x: f64,
    pub mae_y: f64,
}

impl TraceEntry {
    pub fn new(
        step: u64,
        actual: NormalizedPoint,
        predicted: Option<NormalizedPoint>,
        stats: &PredictionStats,
    ) -> Self {
        Self {
            step,
            x: actual.x,
            y: actual.y,
            predicted_x: predicted.map(|p| p.x),
            predicted_y: predicted.map(|p| p.y),
            mae_x: stats.mae_x,
            mae_y: stats.mae_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let mut buffer = RingBuffer::new(3);
        for v in 1..=5 {
            buffer.push(v);
        }
        assert_eq!(buffer.to_vec(), vec![3, 4, 5]);
        assert_eq!(buffer.last(), Some(&5));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_ring_buffer_zero_capacity() {
        let mut buffer = RingBuffer::new(0);
        buffer.push(1);
        assert!(buffer.is_empty());
        assert_eq!(buffer.last(), None);
    }

    #[test]
    fn test_ring_buffer_clear() {
        let mut buffer = RingBuffer::new(2);
        buffer.push("a");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 2);
    }

    #[test]
    fn test_trace_entry_without_prediction() {
        let entry = TraceEntry::new(
            7,
            NormalizedPoint::new(0.25, 0.75),
            None,
            &PredictionStats::default(),
        );
        assert_eq!(entry.step, 7);
        assert_eq!((entry.x, entry.y), (0.25, 0.75));
        assert_eq!(entry.predicted_x, None);
        assert_eq!(entry.mae_x, 0.0);
    }
}
