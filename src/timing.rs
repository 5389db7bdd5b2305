//! Frame clocks and the rolling frame-time statistics consumed by profilers.
//!
//! [`FrameStats`] keeps three views of the same sample stream:
//!
//! * a fixed ring of the last [`FRAME_WINDOW`] delta times used for the
//!   smoothed frame rate,
//! * running minimum and maximum over every sample ever recorded,
//! * a long history (bounded by `history_capacity`) used for the variance.
//!
//! The ring starts zero-filled, so the smoothed rate over-reports until
//! [`FRAME_WINDOW`] frames have been recorded.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use log::warn;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Number of samples averaged by [`FrameStats::smoothed_fps`].
pub const FRAME_WINDOW: usize = 60;

/// Default cap on the variance history: one hour at 60 Hz.
pub const DEFAULT_HISTORY_CAPACITY: usize = 60 * 60 * 60;

/// Monotonic time source in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to. Used for fixed-step and test runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: RwLock<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn set(&self, seconds: f64) {
        *self.now.write() = seconds;
    }

    pub fn advance(&self, seconds: f64) {
        *self.now.write() += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.read()
    }
}

/// Read-only copy of the statistics handed to profiler views.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameStatsSnapshot {
    pub delta_time: f32,
    pub raw_fps: f32,
    pub smoothed_fps: f32,
    pub min_frame_time: f32,
    pub max_frame_time: f32,
    pub frame_time_variance: f32,
    pub samples: usize,
}

/// Rolling frame-time statistics.
#[derive(Debug, Clone)]
pub struct FrameStats {
    window: [f32; FRAME_WINDOW],
    window_index: usize,
    extrema: Option<(f32, f32)>,
    history: VecDeque<f32>,
    history_capacity: usize,
    delta_time: f32,
    recorded: u64,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStats {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// `capacity` is raised to at least one sample.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            window: [0.0; FRAME_WINDOW],
            window_index: 0,
            extrema: None,
            history: VecDeque::new(),
            history_capacity: capacity.max(1),
            delta_time: 0.0,
            recorded: 0,
        }
    }

    /// Records one frame duration in seconds.
    ///
    /// Negative or non-finite durations are stored as `0.0`.
    pub fn record(&mut self, delta_time: f32) {
        let dt = if delta_time.is_finite() && delta_time >= 0.0 {
            delta_time
        } else {
            warn!("discarding invalid frame time {delta_time}; recording 0");
            0.0
        };

        self.delta_time = dt;
        self.window[self.window_index] = dt;
        self.window_index = (self.window_index + 1) % FRAME_WINDOW;

        self.extrema = Some(match self.extrema {
            Some((min, max)) => (min.min(dt), max.max(dt)),
            None => (dt, dt),
        });

        if self.history.len() == self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(dt);
        self.recorded += 1;
    }

    /// Duration of the most recent frame.
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// `1 / delta_time` of the last frame, or `0.0` when it took no time.
    pub fn raw_fps(&self) -> f32 {
        if self.delta_time > 0.0 {
            1.0 / self.delta_time
        } else {
            0.0
        }
    }

    /// `FRAME_WINDOW / sum(window)`: the reciprocal of the mean frame time over
    /// the ring. Unwritten slots count as zero. Returns `0.0` while the ring
    /// sums to zero.
    pub fn smoothed_fps(&self) -> f32 {
        let sum: f32 = self.window.iter().sum();
        if sum > 0.0 {
            FRAME_WINDOW as f32 / sum
        } else {
            0.0
        }
    }

    /// Shortest frame recorded so far, `0.0` before the first sample.
    pub fn min_frame_time(&self) -> f32 {
        self.extrema.map_or(0.0, |(min, _)| min)
    }

    /// Longest frame recorded so far, `0.0` before the first sample.
    pub fn max_frame_time(&self) -> f32 {
        self.extrema.map_or(0.0, |(_, max)| max)
    }

    /// Population variance of the retained history, recomputed on every call.
    pub fn frame_time_variance(&self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        let count = self.history.len() as f64;
        let mean = self.history.iter().map(|&t| t as f64).sum::<f64>() / count;
        let sum_sq = self
            .history
            .iter()
            .map(|&t| {
                let d = t as f64 - mean;
                d * d
            })
            .sum::<f64>();
        (sum_sq / count) as f32
    }

    /// Ring contents in slot order (not arrival order).
    pub fn window(&self) -> &[f32; FRAME_WINDOW] {
        &self.window
    }

    /// Number of samples currently held for the variance.
    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    /// Number of samples recorded since construction, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.recorded
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn snapshot(&self) -> FrameStatsSnapshot {
        FrameStatsSnapshot {
            delta_time: self.delta_time(),
            raw_fps: self.raw_fps(),
            smoothed_fps: self.smoothed_fps(),
            min_frame_time: self.min_frame_time(),
            max_frame_time: self.max_frame_time(),
            frame_time_variance: self.frame_time_variance(),
            samples: self.sample_count(),
        }
    }
}
