//! Simulation clock.
//!
//! The clock only moves forward and is never reset between stages. Elapsed
//! time is kept in `f64` on the host; the shader receives it as `f32`.
//!
//! # Uptime bound
//!
//! Past [`PRECISION_HORIZON_SECS`] (2^17 s, about 36 hours) the spacing
//! between adjacent `f32` values reaches 1/64 s, so a 60 Hz frame step no
//! longer advances the shader clock evenly and drift and flicker visibly
//! stutter. Noise and hash stay bounded beyond that point. The clock logs a
//! single warning when it crosses the horizon.

use std::time::Instant;

/// Elapsed seconds after which the `f32` shader clock quantizes visibly.
pub const PRECISION_HORIZON_SECS: f64 = 131_072.0;

/// Monotonic frame clock.
#[derive(Debug)]
pub struct Clock {
    last_frame: Instant,
    elapsed: f64,
    delta: f32,
    frame: u64,
    /// Used in place of the measured wall delta when set.
    fixed_delta: Option<f32>,
    time_scale: f32,
    paused: bool,
    horizon_warned: bool,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            elapsed: 0.0,
            delta: 0.0,
            frame: 0,
            fixed_delta: None,
            time_scale: 1.0,
            paused: false,
            horizon_warned: false,
        }
    }

    /// Start from an arbitrary elapsed time.
    pub fn starting_at(elapsed: f64) -> Self {
        Self {
            elapsed: elapsed.max(0.0),
            ..Self::new()
        }
    }

    /// Advance by the wall time since the previous tick. Call once per frame.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.advance(self.fixed_delta.unwrap_or(raw))
    }

    /// Advance by `dt` seconds (scaled by the time scale). Negative steps are
    /// ignored. Returns the applied delta.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.paused {
            self.delta = 0.0;
            return 0.0;
        }
        self.delta = dt.max(0.0) * self.time_scale;
        self.elapsed += self.delta as f64;
        self.frame += 1;

        if !self.horizon_warned && self.elapsed > PRECISION_HORIZON_SECS {
            self.horizon_warned = true;
            tracing::warn!(
                elapsed = self.elapsed,
                "clock passed the f32 precision horizon; drift and flicker will quantize"
            );
        }
        self.delta
    }

    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Elapsed time as sent to the GPU.
    #[inline]
    pub fn shader_time(&self) -> f32 {
        self.elapsed as f32
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Whether the precision warning has been logged.
    #[inline]
    pub fn past_precision_horizon(&self) -> bool {
        self.horizon_warned
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }

    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// Negative scales clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
