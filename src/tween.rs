//! Host-side scalar tween for the enter progress.
//!
//! [`TransitionDriver`] is poll-driven: the frame loop calls
//! [`TransitionDriver::tick`] with the current clock, which applies the
//! easing curve, writes the new value and reports completion. There is no
//! timer or callback that outlives a frame.
//!
//! At most one tween is in flight. Starting a new one replaces the old one,
//! whose completion is then never reported.

use serde::{Deserialize, Serialize};

/// Easing curves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInCubic,
    EaseOutCubic,
    /// Cubic in-out (GSAP's `power2.inOut`).
    EaseInOutCubic,
}

impl Easing {
    /// Apply easing to `t`, clamped to `[0, 1]`. Both endpoints map exactly.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Target, timing and curve of one tween.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TweenSpec {
    pub target: f32,
    /// Seconds from the end of the delay to the target.
    pub duration: f32,
    #[serde(default)]
    pub delay: f32,
    #[serde(default)]
    pub easing: Easing,
}

impl TweenSpec {
    pub fn new(target: f32, duration: f32) -> Self {
        Self {
            target,
            duration,
            delay: 0.0,
            easing: Easing::Linear,
        }
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// Identifies one started tween.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TweenId(u64);

#[derive(Debug, Clone, Copy)]
struct ActiveTween {
    id: TweenId,
    from: f32,
    spec: TweenSpec,
    started_at: f64,
}

/// Single-writer tween of a value clamped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct TransitionDriver {
    progress: f32,
    active: Option<ActiveTween>,
    next_id: u64,
}

impl TransitionDriver {
    pub fn new(initial: f32) -> Self {
        Self {
            progress: unit_or(initial, 0.0),
            active: None,
            next_id: 0,
        }
    }

    #[inline]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_id(&self) -> Option<TweenId> {
        self.active.map(|tween| tween.id)
    }

    /// Start tweening from the current value. Any in-flight tween is dropped.
    pub fn start(&mut self, spec: TweenSpec, now: f64) -> TweenId {
        let spec = TweenSpec {
            target: unit_or(spec.target, self.progress),
            duration: non_negative(spec.duration),
            delay: non_negative(spec.delay),
            easing: spec.easing,
        };
        if let Some(previous) = self.active.take() {
            tracing::debug!(id = previous.id.0, progress = self.progress, "tween superseded");
        }
        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.active = Some(ActiveTween {
            id,
            from: self.progress,
            spec,
            started_at: now,
        });
        tracing::debug!(
            id = id.0,
            from = self.progress,
            target = spec.target,
            duration = spec.duration,
            "tween started"
        );
        id
    }

    /// Drop the in-flight tween, leaving the value where it is.
    pub fn cancel(&mut self) -> Option<TweenId> {
        self.active.take().map(|tween| tween.id)
    }

    /// Overwrite the value directly. Cancels the in-flight tween.
    pub fn set_progress(&mut self, value: f32) {
        self.active = None;
        self.progress = unit_or(value, self.progress);
    }

    /// Evaluate the tween at `now`.
    ///
    /// Returns the id of the tween that completed on this call. Each id is
    /// returned at most once, and only after the value has been set to the
    /// target.
    pub fn tick(&mut self, now: f64) -> Option<TweenId> {
        let tween = self.active?;
        let spec = tween.spec;
        let elapsed = (now - tween.started_at) as f32 - spec.delay;
        if elapsed.is_nan() || elapsed < 0.0 {
            return None;
        }

        if spec.duration <= 0.0 || elapsed >= spec.duration {
            self.progress = spec.target;
            self.active = None;
            return Some(tween.id);
        }

        let eased = spec.easing.apply(elapsed / spec.duration);
        self.progress = unit_or(tween.from + (spec.target - tween.from) * eased, self.progress);
        None
    }
}

/// Clamp to `[0, 1]`, falling back to `fallback` for NaN.
fn unit_or(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Non-finite or negative durations collapse to zero.
fn non_negative(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

impl Default for TransitionDriver {
    fn default() -> Self {
        Self::new(0.0)
    }
}
