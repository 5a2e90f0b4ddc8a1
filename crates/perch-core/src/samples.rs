#![forbid(unsafe_code)]

//! Time-windowed drag position history used to estimate release velocity.
//!
//! # Invariants
//!
//! 1. After every [`record`](PositionSampleBuffer::record), no retained sample
//!    is older than `window_ms` relative to the newest sample.
//! 2. The buffer never holds more than `max_samples` samples; the oldest are
//!    dropped first.
//! 3. [`estimate_velocity`](PositionSampleBuffer::estimate_velocity) only uses
//!    the oldest and newest retained samples.

use std::collections::VecDeque;

use crate::geometry::Velocity;

/// Default age window for retained samples.
pub const DEFAULT_SAMPLE_WINDOW_MS: u64 = 120;

/// Default cap on retained samples.
pub const DEFAULT_MAX_SAMPLES: usize = 12;

/// One observed drag position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub timestamp_ms: u64,
    pub x: f64,
    pub y: f64,
}

/// Bounded history of drag samples.
#[derive(Debug, Clone)]
pub struct PositionSampleBuffer {
    samples: VecDeque<PositionSample>,
    window_ms: u64,
    max_samples: usize,
}

impl Default for PositionSampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW_MS, DEFAULT_MAX_SAMPLES)
    }
}

impl PositionSampleBuffer {
    /// Create a buffer with the given age window and count cap.
    ///
    /// A cap of zero is raised to two so a velocity can still be estimated.
    #[must_use]
    pub fn new(window_ms: u64, max_samples: usize) -> Self {
        let max_samples = max_samples.max(2);
        Self {
            samples: VecDeque::with_capacity(max_samples + 1),
            window_ms,
            max_samples,
        }
    }

    /// Append a sample and prune by age and count.
    pub fn record(&mut self, x: f64, y: f64, timestamp_ms: u64) {
        self.samples.push_back(PositionSample { timestamp_ms, x, y });
        self.prune(timestamp_ms);
    }

    fn prune(&mut self, newest_ms: u64) {
        let cutoff = newest_ms.saturating_sub(self.window_ms);
        while let Some(front) = self.samples.front() {
            if front.timestamp_ms < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Drop every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Retained samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter()
    }

    /// Velocity between the oldest and newest retained samples, in px/s.
    ///
    /// Returns `None` with fewer than two samples or a non-positive time span.
    #[must_use]
    pub fn estimate_velocity(&self) -> Option<Velocity> {
        if self.samples.len() < 2 {
            return None;
        }
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        if last.timestamp_ms <= first.timestamp_ms {
            return None;
        }
        let dt = (last.timestamp_ms - first.timestamp_ms) as f64 / 1000.0;
        Some(Velocity::new((last.x - first.x) / dt, (last.y - first.y) / dt))
    }

    /// Like [`estimate_velocity`](Self::estimate_velocity), but first drops
    /// samples that fell out of the window by `now_ms`.
    ///
    /// A pointer held still before release sends no new samples, so the
    /// release time is what ages them out.
    pub fn estimate_velocity_at(&mut self, now_ms: u64) -> Option<Velocity> {
        self.prune(now_ms);
        self.estimate_velocity()
    }
}
