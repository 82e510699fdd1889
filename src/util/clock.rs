//! Interval timing for benchmark phases
//!
//! Wraps the monotonic `Instant` counter. Elapsed values are floored so
//! that callers may divide by them unconditionally.

use std::time::{Duration, Instant};

/// Smallest elapsed time ever reported, in seconds
pub const MIN_ELAPSED_SECS: f64 = 0.01;

/// Start/stop interval timer
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    started: Instant,
}

impl Clock {
    /// Capture the counter and begin timing
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Capture a second counter value and return elapsed seconds
    pub fn stop(&self) -> f64 {
        self.sample().seconds()
    }

    /// Capture a second counter value as a sample
    pub fn sample(&self) -> TimingSample {
        TimingSample::new(self.started, Instant::now())
    }
}

/// A start/stop pair of counter readings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    pub start: Instant,
    pub stop: Instant,
}

impl TimingSample {
    pub fn new(start: Instant, stop: Instant) -> Self {
        Self { start, stop }
    }

    /// Raw elapsed time; zero if the readings are out of order
    pub fn duration(&self) -> Duration {
        self.stop.saturating_duration_since(self.start)
    }

    /// Elapsed seconds, never below [`MIN_ELAPSED_SECS`]
    pub fn seconds(&self) -> f64 {
        floor_elapsed(self.duration().as_secs_f64())
    }
}

/// Clamp an elapsed value so it is safe to divide by
pub fn floor_elapsed(seconds: f64) -> f64 {
    if seconds.is_nan() {
        return MIN_ELAPSED_SECS;
    }
    seconds.max(MIN_ELAPSED_SECS)
}
