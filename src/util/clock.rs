//! Monotonic interval clock used for tick gating and delta-time measurement.
//!
//! Backed by `std::time::Instant`, so wall-clock adjustments never affect
//! elapsed measurements.

use std::time::Instant;

/// A resettable stopwatch. Starts running at construction.
#[derive(Debug, Clone)]
pub struct Clock {
    started: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Whether at least `duration_ms` milliseconds passed since the last reset.
    pub fn has_elapsed(&self, duration_ms: u64) -> bool {
        self.started.elapsed().as_millis() >= u128::from(duration_ms)
    }

    /// Restart the measurement from now.
    pub fn reset(&mut self) {
        self.started = Instant::now();
    }

    /// Seconds since the last reset, as a float delta-time.
    pub fn elapsed_seconds(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
