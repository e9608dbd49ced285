//! Frame timing.
//!
//! ```ignore
//! let mut time = Time::new();
//!
//! // once per frame:
//! let delta = time.update();
//! if time.fps_updated() {
//!     log::debug!("{:.1} fps", time.fps());
//! }
//! ```

use std::time::{Duration, Instant};

/// Frame clock: delta time, frame count and a periodically refreshed FPS figure.
#[derive(Debug)]
pub struct Time {
    start: Instant,
    last_frame: Instant,
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    fps_updated: bool,
    /// Upper bound on a single delta, in seconds.
    max_delta: f32,
}

impl Time {
    /// Create a new time tracker starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_secs(1),
            fps_updated: false,
            max_delta: 0.25,
        }
    }

    /// Advance to now. Call once per frame; returns the delta in seconds.
    pub fn update(&mut self) -> f32 {
        self.advance(Instant::now())
    }

    fn advance(&mut self, now: Instant) -> f32 {
        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.delta_secs = raw_delta.min(self.max_delta);
        self.last_frame = now;
        self.elapsed_secs = now.duration_since(self.start).as_secs_f32();
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        self.fps_updated = fps_elapsed >= self.fps_update_interval;
        if self.fps_updated {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.delta_secs
    }

    /// Total elapsed time in seconds since start.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Time since last frame in seconds (delta time).
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Total frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Calculated frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Whether the last `update` refreshed the FPS figure.
    #[inline]
    pub fn fps_updated(&self) -> bool {
        self.fps_updated
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
