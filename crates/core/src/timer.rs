//! Frame timing and frame-rate statistics.

use std::time::{Duration, Instant};

/// High-resolution timer measuring per-frame delta time.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
}

impl Timer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
        }
    }

    /// Total elapsed time since the timer was created or reset.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time elapsed since the previous call to `tick()`.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        delta
    }

    /// Delta time in seconds since the previous tick.
    pub fn delta_secs(&mut self) -> f32 {
        self.tick().as_secs_f32()
    }

    /// Restart both the total and the delta clocks.
    ///
    /// Called at startup and whenever the window comes back from being
    /// minimized, so the pause does not show up as one huge frame.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last_tick = now;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Averaged frame statistics over one reporting window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStatsSample {
    pub fps: f32,
    pub ms_per_frame: f32,
}

/// Counts frames and reports an average once per second.
#[derive(Debug, Default)]
pub struct FrameStats {
    frames: u32,
    accumulated: f32,
}

impl FrameStats {
    const WINDOW_SECS: f32 = 1.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame of `delta_secs` duration.
    ///
    /// Returns a sample each time a full second has accumulated.
    pub fn record(&mut self, delta_secs: f32) -> Option<FrameStatsSample> {
        self.frames += 1;
        self.accumulated += delta_secs;

        if self.accumulated < Self::WINDOW_SECS {
            return None;
        }

        let fps = self.frames as f32 / self.accumulated;
        let sample = FrameStatsSample {
            fps,
            ms_per_frame: 1000.0 / fps,
        };
        self.frames = 0;
        self.accumulated = 0.0;
        Some(sample)
    }
}
